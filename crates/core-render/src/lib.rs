//! Rendering primitives: a queued painter over crossterm, screen layout
//! arithmetic, palette-to-terminal style mapping, and text row helpers.

pub mod layout;
pub mod painter;
pub mod style;
pub mod text;

pub use layout::{Region, ScreenLayout, compute};
pub use painter::Painter;
pub use text::{Gutter, expand_tabs_clip};
