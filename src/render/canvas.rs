use std::fmt;

use serde::{Deserialize, Serialize};

use crate::candle::TimestampSec;

/// 8-bit RGBA color. Serialized as `#rrggbb` or `#rrggbbaa`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{}' must start with '#'", value))?;
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return Err(format!("color '{}' must be #rrggbb or #rrggbbaa", value));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid hex in color '{}'", value))
        };
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color::from_rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Pixel rectangle, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn from_ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    /// Normalizes so width and height are never negative.
    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            width: (right - left).abs(),
            height: (bottom - top).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// Drawing surface provided by the host renderer.
pub trait Canvas {
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32);
    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, width: f32, style: LineStyle);
    fn text(&mut self, x: f32, y: f32, text: &str, color: Color, font_size: f32);
}

/// Host chart's price axis: price to y pixel, `None` when not mappable.
#[cfg_attr(test, mockall::automock)]
pub trait PriceScale {
    fn price_to_coordinate(&self, price: f64) -> Option<f32>;
}

/// Host chart's time axis: epoch seconds to x pixel.
#[cfg_attr(test, mockall::automock)]
pub trait TimeScale {
    fn time_to_coordinate(&self, time: TimestampSec) -> Option<f32>;
}

/// Linear price axis between two anchor prices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearPriceScale {
    pub top_price: f64,
    pub bottom_price: f64,
    pub top_px: f32,
    pub bottom_px: f32,
}

impl LinearPriceScale {
    pub fn new(top_price: f64, bottom_price: f64, top_px: f32, bottom_px: f32) -> Self {
        Self { top_price, bottom_price, top_px, bottom_px }
    }
}

impl PriceScale for LinearPriceScale {
    fn price_to_coordinate(&self, price: f64) -> Option<f32> {
        let span = self.top_price - self.bottom_price;
        if !price.is_finite() || span == 0.0 || !span.is_finite() {
            return None;
        }
        let t = (self.top_price - price) / span;
        Some(self.top_px + (self.bottom_px - self.top_px) * t as f32)
    }
}

/// One recorded canvas call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color, width: f32 },
    Line { from: (f32, f32), to: (f32, f32), color: Color, width: f32, style: LineStyle },
    Text { x: f32, y: f32, text: String, color: Color, font_size: f32 },
}

/// Canvas that records every call, for replay onto a real backend or inspection.
#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    pub commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Replay onto another canvas.
    pub fn replay(&self, target: &mut dyn Canvas) {
        for command in &self.commands {
            match command {
                DrawCommand::FillRect { rect, color } => target.fill_rect(*rect, *color),
                DrawCommand::StrokeRect { rect, color, width } => target.stroke_rect(*rect, *color, *width),
                DrawCommand::Line { from, to, color, width, style } => target.line(*from, *to, *color, *width, *style),
                DrawCommand::Text { x, y, text, color, font_size } => target.text(*x, *y, text, *color, *font_size),
            }
        }
    }
}

impl Canvas for RecordingCanvas {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.commands.push(DrawCommand::StrokeRect { rect, color, width });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, width: f32, style: LineStyle) {
        self.commands.push(DrawCommand::Line { from, to, color, width, style });
    }

    fn text(&mut self, x: f32, y: f32, text: &str, color: Color, font_size: f32) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            text: text.to_string(),
            color,
            font_size,
        });
    }
}
