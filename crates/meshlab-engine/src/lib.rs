//! Mesh Lab engine crate.
//!
//! Window runtime, GPU device, input, timing, logging, and the renderers that
//! put the field and its point handles on screen or into an offscreen
//! texture for export.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod app;

pub mod logging;
pub mod render;
pub mod offscreen;

pub use offscreen::OffscreenSurface;
