//! Contract between the runtime and the editor.
//!
//! The runtime owns the event loop, window and GPU; the editor sees them only
//! through [`FrameCtx`] once per frame.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
