//! Frame timing.
//!
//! One [`FrameClock`] per window, ticked once per presented frame. Its
//! accumulated `elapsed` is what the studio feeds into the core render loop.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
