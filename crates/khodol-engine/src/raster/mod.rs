//! Software reference executor.
//!
//! Runs the Rust stage implementations over a CPU framebuffer with the same
//! fixed-function state as the GPU pipelines (straight-alpha blending, depth
//! `LessEqual`, no culling, near-plane clipping). Output is bit-for-bit
//! reproducible.

mod framebuffer;
mod pipeline;
mod triangle;

pub use framebuffer::{BlendMode, DepthTest, Framebuffer, RasterState};
pub use pipeline::{DrawStats, SoftwarePipeline};
