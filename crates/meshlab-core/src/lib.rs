//! Mesh Lab core crate.
//!
//! Scene model, CPU field evaluator, drift, live loop, pointer interaction
//! and the export pipeline. Nothing here touches the GPU or a window.

pub mod coords;
pub mod model;
pub mod field;
pub mod drift;
pub mod snapshot;
pub mod session;

pub mod render_loop;
pub mod interaction;
pub mod export;

pub use coords::{HexColor, Rgb, Vec2, Viewport};
pub use field::{FieldFrame, FieldPoint};
pub use model::{ConfigPatch, ExportConfig, ExportPatch, GlobalConfig, GradientPoint, PointId, PointPatch, WarpShape};
pub use session::{Notice, NoticeLevel, Session};
pub use snapshot::{SceneSnapshot, SnapshotError};
