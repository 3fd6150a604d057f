//! Window and event loop.
//!
//! Owns the `winit` EventLoop and the single editor window, and wires them to
//! the GPU layer.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
pub use winit::window::CursorIcon;
