//! Coordinate and color types shared by the evaluator, the interaction layer
//! and the exporters.
//!
//! Texture space (uv):
//! - (0, 0) bottom-left, (1, 1) top-right
//! - the field evaluator and the scene document work exclusively in uv
//!
//! Screen space is only seen by [`Viewport`], which converts pointer
//! positions into uv.

mod color;
mod vec2;
mod viewport;

pub use color::{ColorParseError, HexColor, Rgb};
pub use vec2::Vec2;
pub use viewport::Viewport;
