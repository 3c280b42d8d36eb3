//! Renderer-agnostic drawing of computed profiles onto a host chart.
pub mod canvas;
pub mod options;
pub mod palette;
pub mod primitive;

pub use canvas::{Canvas, Color, DrawCommand, LineStyle, LinearPriceScale, PriceScale, Rect, RecordingCanvas, TimeScale};
pub use options::{ColorMap, ProfilePosition, RenderOptions, TpoDisplay};
pub use palette::{color_for_letter, letter_palette};
pub use primitive::ProfileRenderPrimitive;
