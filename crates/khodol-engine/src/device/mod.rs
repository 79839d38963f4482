//! GPU device + surface management.
//!
//! - creating the wgpu Instance/Adapter/Device/Queue, with a feature check
//!   against [`GpuInit::required_features`] before the device is requested
//! - creating & configuring the Surface and its depth attachment
//! - acquiring frames and providing encoders/views for rendering

mod error;
mod frame;
mod gpu;
mod headless;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use headless::HeadlessGpu;
pub use init::{GpuInit, bindless_features, require_features};
