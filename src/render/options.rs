use serde::{Deserialize, Serialize};

use super::canvas::Color;

/// Where the profile sits horizontally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfilePosition {
    #[default]
    Left,
    Right,
    /// Anchored at the session start on the time axis
    Overlay,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TpoDisplay {
    /// One glyph per period
    #[default]
    Letters,
    /// One filled cell per period
    Blocks,
}

/// Colors keyed by element name.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorMap {
    pub poc: Color,
    pub vah: Color,
    pub val: Color,
    pub poor_high: Color,
    pub poor_low: Color,
    pub single_print: Color,
    pub midpoint: Color,
    pub ib_border: Color,
    pub ib_fill: Color,
    pub value_area: Color,
    pub open: Color,
    pub close: Color,
    /// Overflow markers
    pub text: Color,
}

impl Default for ColorMap {
    fn default() -> Self {
        Self {
            poc: Color::from_rgb(255, 193, 7),
            vah: Color::from_rgb(38, 166, 154),
            val: Color::from_rgb(239, 83, 80),
            poor_high: Color::from_rgb(255, 112, 67),
            poor_low: Color::from_rgb(255, 112, 67),
            single_print: Color::from_rgba(156, 39, 176, 72),
            midpoint: Color::from_rgb(158, 158, 158),
            ib_border: Color::from_rgb(33, 150, 243),
            ib_fill: Color::from_rgba(33, 150, 243, 32),
            value_area: Color::from_rgba(120, 144, 156, 40),
            open: Color::from_rgb(76, 175, 80),
            close: Color::from_rgb(244, 67, 54),
            text: Color::from_rgb(224, 224, 224),
        }
    }
}

/// Render-side options. Every visual element can be switched off on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    pub show_initial_balance: bool,
    pub show_value_area: bool,
    pub show_single_prints: bool,
    pub show_letters: bool,
    pub show_poc: bool,
    pub show_vah_val: bool,
    pub show_poor_extremes: bool,
    pub show_midpoint: bool,
    pub show_open_close: bool,

    pub position: ProfilePosition,
    pub display: TpoDisplay,
    pub letter_width: f32,
    pub letter_height: f32,
    pub letter_spacing: f32,
    /// Letters drawn per row before the rest collapse into a `+N` marker
    pub max_letters_visible: usize,
    pub font_size: f32,
    pub line_width: f32,
    /// Gap between the pane edge and the profile, and between stacked profiles
    pub margin: f32,
    /// Draw every session instead of only the most recent one
    pub render_all_sessions: bool,

    pub colors: ColorMap,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_initial_balance: true,
            show_value_area: true,
            show_single_prints: true,
            show_letters: true,
            show_poc: true,
            show_vah_val: true,
            show_poor_extremes: true,
            show_midpoint: true,
            show_open_close: true,
            position: ProfilePosition::default(),
            display: TpoDisplay::default(),
            letter_width: 10.0,
            letter_height: 12.0,
            letter_spacing: 1.0,
            max_letters_visible: 26,
            font_size: 10.0,
            line_width: 1.0,
            margin: 8.0,
            render_all_sessions: false,
            colors: ColorMap::default(),
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), String> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;

        if !positive(self.letter_width) || !positive(self.letter_height) {
            return Err("letterWidth and letterHeight must be positive".to_string());
        }
        if !non_negative(self.letter_spacing) || !non_negative(self.margin) {
            return Err("letterSpacing and margin must not be negative".to_string());
        }
        if self.max_letters_visible == 0 {
            return Err("maxLettersVisible must be at least 1".to_string());
        }
        if !positive(self.font_size) || !positive(self.line_width) {
            return Err("fontSize and lineWidth must be positive".to_string());
        }
        Ok(())
    }

    /// Horizontal distance between two letter columns.
    pub fn column_step(&self) -> f32 {
        self.letter_width + self.letter_spacing
    }
}
