//! Khodol engine crate.
//!
//! Bindless instanced forward rendering: shared record layouts, the vertex and
//! fragment stage logic, named stage interconnects, a CPU reference executor,
//! and the wgpu renderers that run the same stages on the GPU.

pub mod camera;
pub mod core;
pub mod device;
pub mod logging;
pub mod raster;
pub mod records;
pub mod render;
pub mod stage;
pub mod time;
pub mod window;
