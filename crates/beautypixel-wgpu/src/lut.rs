//! LUT resource manifest and lookup-table set
//!
//! Grading uses four fixed reference images: a gray ramp, an identity
//! ("origin") cube, a skin-tone cube, and a custom cube. They are named by an
//! external JSON manifest and decoded by the caller-supplied decoder; the
//! four decodes run concurrently and are joined before the set is usable.
//! All four must be present before a frame with whiten > 0 can run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::pixel::PixelBuffer;

/// Paths of the four LUT images, resolved from a fixed external manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LutManifest {
    /// Gray-ramp LUT (1-D, sampled per channel)
    pub gray: PathBuf,
    /// Identity/"origin" 16-level cube LUT
    pub origin: PathBuf,
    /// Skin-tone 16-level cube LUT
    pub skin: PathBuf,
    /// Custom 64-level cube LUT
    pub custom: PathBuf,
}

impl LutManifest {
    /// Parses a manifest from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|e| PipelineError::AssetLoad {
            reason: format!("invalid LUT manifest: {e}"),
        })
    }
}

/// The four decoded LUT images for one source-image session.
#[derive(Debug, Clone)]
pub struct LutSet {
    /// Gray-ramp LUT pixels
    pub gray: PixelBuffer,
    /// Origin cube LUT pixels
    pub origin: PixelBuffer,
    /// Skin cube LUT pixels
    pub skin: PixelBuffer,
    /// Custom cube LUT pixels
    pub custom: PixelBuffer,
}

impl LutSet {
    /// Decodes all four manifest entries concurrently and joins the results.
    ///
    /// `decode` is the external decoding collaborator; it is invoked once per
    /// asset from scoped threads. The first failure is reported with the
    /// offending asset named; the session cannot start without all four.
    pub fn load_with<F>(manifest: &LutManifest, decode: F) -> Result<Self, PipelineError>
    where
        F: Fn(&Path) -> Result<PixelBuffer, String> + Sync,
    {
        let decode_named = |name: &'static str, path: &Path| -> Result<PixelBuffer, PipelineError> {
            decode(path).map_err(|e| PipelineError::AssetLoad {
                reason: format!("LUT `{name}` ({}): {e}", path.display()),
            })
        };

        std::thread::scope(|scope| {
            let gray = scope.spawn(|| decode_named("gray", &manifest.gray));
            let origin = scope.spawn(|| decode_named("origin", &manifest.origin));
            let skin = scope.spawn(|| decode_named("skin", &manifest.skin));
            let custom = scope.spawn(|| decode_named("custom", &manifest.custom));

            Ok(Self {
                gray: gray.join().expect("LUT decode thread panicked")?,
                origin: origin.join().expect("LUT decode thread panicked")?,
                skin: skin.join().expect("LUT decode thread panicked")?,
                custom: custom.join().expect("LUT decode thread panicked")?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_round_trip() {
        let json = r#"{
            "gray": "luts/gray.png",
            "origin": "luts/origin.png",
            "skin": "luts/skin.png",
            "custom": "luts/custom.png"
        }"#;
        let manifest = LutManifest::from_json(json).unwrap();
        assert_eq!(manifest.gray, PathBuf::from("luts/gray.png"));
        assert_eq!(manifest.custom, PathBuf::from("luts/custom.png"));
    }

    #[test]
    fn test_manifest_rejects_missing_entry() {
        let err = LutManifest::from_json(r#"{"gray": "g.png"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::AssetLoad { .. }));
    }

    #[test]
    fn test_load_joins_all_four() {
        let manifest = LutManifest::from_json(
            r#"{"gray": "g", "origin": "o", "skin": "s", "custom": "c"}"#,
        )
        .unwrap();
        let set = LutSet::load_with(&manifest, |_| PixelBuffer::new(2, 2, vec![0u8; 16]).map_err(|e| e.to_string())).unwrap();
        assert_eq!(set.gray.width(), 2);
        assert_eq!(set.origin.height(), 2);
    }

    #[test]
    fn test_load_names_failing_asset() {
        let manifest = LutManifest::from_json(
            r#"{"gray": "g", "origin": "o", "skin": "s", "custom": "c"}"#,
        )
        .unwrap();
        let result = LutSet::load_with(&manifest, |path| {
            if path == Path::new("s") {
                Err("decode failed".to_string())
            } else {
                PixelBuffer::new(1, 1, vec![0u8; 4]).map_err(|e| e.to_string())
            }
        });
        match result {
            Err(PipelineError::AssetLoad { reason }) => {
                assert!(reason.contains("skin"), "reason was: {reason}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
