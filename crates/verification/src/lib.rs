//! Verification utilities for BeautyPixel-wgpu
//!
//! This crate provides CPU reference implementations of every pipeline stage
//! and comparison tools for verifying the GPU implementation against them.

pub mod compare;
pub mod cpu_reference;
