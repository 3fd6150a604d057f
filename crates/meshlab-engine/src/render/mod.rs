//! GPU rendering.
//!
//! Each renderer owns its pipelines and buffers and builds them lazily for the
//! target format it is first asked to draw into.
//!
//! Convention:
//! - The field shader works in texture space (bottom-left origin, +Y up).
//! - Overlay geometry is in logical pixels (top-left origin, +Y down) and is
//!   converted to NDC with a viewport uniform.

mod ctx;
mod field;
mod handles;
mod uniforms;

pub use ctx::{RenderCtx, RenderTarget};
pub use field::FieldRenderer;
pub use handles::{HandleHighlight, HandleRenderer};
pub use uniforms::{FieldUniform, ViewportUniform};
