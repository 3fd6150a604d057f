/// What the frame loop should do after a swapchain error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Swapchain was rebuilt; draw again next frame.
    Reconfigured,
    SkipFrame,
    /// Out of memory. The runtime shuts down.
    Fatal,
}
