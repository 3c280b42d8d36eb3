use std::sync::Arc;

use tracing::{debug, trace};

use crate::market_profile::structs::Profile;
use super::canvas::{Canvas, Color, LineStyle, PriceScale, Rect, TimeScale};
use super::options::{ProfilePosition, RenderOptions, TpoDisplay};
use super::palette::color_for_letter;

/// Horizontal placement of one profile: where column 0 starts and which way
/// later columns grow.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Band {
    origin: f32,
    step: f32,
    rightward: bool,
    columns: usize,
}

impl Band {
    fn column_left(&self, index: usize) -> f32 {
        if self.rightward {
            self.origin + index as f32 * self.step
        } else {
            self.origin - (index + 1) as f32 * self.step
        }
    }

    fn left(&self) -> f32 {
        if self.rightward {
            self.origin
        } else {
            self.origin - self.columns as f32 * self.step
        }
    }

    fn right(&self) -> f32 {
        if self.rightward {
            self.origin + self.columns as f32 * self.step
        } else {
            self.origin
        }
    }

    fn width(&self) -> f32 {
        self.columns as f32 * self.step
    }
}

fn hline(canvas: &mut dyn Canvas, x0: f32, x1: f32, y: f32, color: Color, width: f32, style: LineStyle) {
    canvas.line((x0, y), (x1, y), color, width, style);
}

/// Absent and zero-valued prices draw nothing.
fn present(price: f64) -> Option<f64> {
    (price.is_finite() && price != 0.0).then_some(price)
}

/// Chart-attached drawing object for computed profiles.
///
/// Holds the last `set_data` snapshot and the host's coordinate capabilities.
/// Every `draw` repaints from scratch against the current mapping.
pub struct ProfileRenderPrimitive {
    options: RenderOptions,
    profiles: Arc<Vec<Profile>>,
    price_scale: Option<Box<dyn PriceScale>>,
    time_scale: Option<Box<dyn TimeScale>>,
}

impl ProfileRenderPrimitive {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            profiles: Arc::new(Vec::new()),
            price_scale: None,
            time_scale: None,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    /// Replace the rendered snapshot.
    pub fn set_data(&mut self, profiles: Vec<Profile>) {
        debug!("Render primitive received {} profiles", profiles.len());
        self.profiles = Arc::new(profiles);
    }

    /// Share an existing snapshot without copying it.
    pub fn set_shared_data(&mut self, profiles: Arc<Vec<Profile>>) {
        self.profiles = profiles;
    }

    pub fn profiles(&self) -> Arc<Vec<Profile>> {
        Arc::clone(&self.profiles)
    }

    /// `time_scale` is only consulted for overlay positioning.
    pub fn attach(&mut self, price_scale: Box<dyn PriceScale>, time_scale: Option<Box<dyn TimeScale>>) {
        self.price_scale = Some(price_scale);
        self.time_scale = time_scale;
    }

    pub fn detach(&mut self) {
        self.price_scale = None;
        self.time_scale = None;
    }

    pub fn is_attached(&self) -> bool {
        self.price_scale.is_some()
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, viewport: Rect) {
        let Some(scale) = self.price_scale.as_deref() else {
            trace!("Render primitive not attached; skipping paint");
            return;
        };

        let profiles: &[Profile] = if self.options.render_all_sessions {
            &self.profiles
        } else {
            match self.profiles.split_last() {
                Some((last, _)) => std::slice::from_ref(last),
                None => &[],
            }
        };

        // Most recent session sits closest to the anchor edge.
        let mut offset = 0.0;
        for profile in profiles.iter().rev() {
            if profile.price_levels.is_empty() {
                continue;
            }
            let band = self.band_for(profile, viewport, offset);
            self.draw_profile(canvas, scale, profile, band);
            offset += band.width() + self.options.margin;
        }
    }

    fn columns_for(&self, profile: &Profile) -> usize {
        let max = self.options.max_letters_visible.max(1);
        let widest = profile
            .price_levels
            .iter()
            .map(|l| l.letters.len())
            .max()
            .unwrap_or(0);
        widest.min(max).max(1) + usize::from(widest > max)
    }

    fn band_for(&self, profile: &Profile, viewport: Rect, offset: f32) -> Band {
        let options = &self.options;
        let columns = self.columns_for(profile);
        let step = options.column_step();
        let left_anchor = Band {
            origin: viewport.left + options.margin + offset,
            step,
            rightward: true,
            columns,
        };

        match options.position {
            ProfilePosition::Left => left_anchor,
            ProfilePosition::Right => Band {
                origin: viewport.right() - options.margin - offset,
                step,
                rightward: false,
                columns,
            },
            ProfilePosition::Overlay => self
                .time_scale
                .as_deref()
                .and_then(|ts| ts.time_to_coordinate(profile.start_time))
                .map(|x| Band {
                    origin: x,
                    step,
                    rightward: true,
                    columns,
                })
                .unwrap_or(left_anchor),
        }
    }

    /// Row height in pixels: one tick, capped at the configured letter height.
    fn row_height(&self, scale: &dyn PriceScale, profile: &Profile) -> f32 {
        let letter_height = self.options.letter_height;
        let Some(price) = profile.price_levels.first().map(|l| l.price) else {
            return letter_height;
        };

        let tick_px = scale
            .price_to_coordinate(price)
            .zip(scale.price_to_coordinate(price - profile.tick_size))
            .map(|(a, b)| (a - b).abs());

        match tick_px {
            Some(px) if px > 0.0 => px.min(letter_height).max(1.0),
            _ => letter_height,
        }
    }

    fn draw_profile(&self, canvas: &mut dyn Canvas, scale: &dyn PriceScale, profile: &Profile, band: Band) {
        let options = &self.options;
        let colors = &options.colors;
        let row_height = self.row_height(scale, profile);
        let half = row_height / 2.0;
        let (x0, x1) = (band.left(), band.right());
        let y = |price: f64| present(price).and_then(|p| scale.price_to_coordinate(p));

        if options.show_initial_balance {
            if let (Some(top), Some(bottom)) = (y(profile.ib_high), y(profile.ib_low)) {
                let rect = Rect::from_ltrb(x0, top - half, x1, bottom + half);
                canvas.fill_rect(rect, colors.ib_fill);
                canvas.stroke_rect(rect, colors.ib_border, options.line_width);
            }
        }

        if options.show_value_area {
            if let (Some(top), Some(bottom)) = (y(profile.vah), y(profile.val)) {
                canvas.fill_rect(Rect::from_ltrb(x0, top - half, x1, bottom + half), colors.value_area);
            }
        }

        if options.show_single_prints {
            for py in profile.single_prints.iter().filter_map(|&p| y(p)) {
                canvas.fill_rect(Rect::from_ltrb(x0, py - half, x1, py + half), colors.single_print);
            }
        }

        if options.show_letters {
            self.draw_letters(canvas, scale, profile, band, row_height);
        }

        if options.show_poc {
            if let Some(py) = y(profile.poc) {
                hline(canvas, x0, x1, py, colors.poc, options.line_width * 2.0, LineStyle::Solid);
            }
        }

        if options.show_vah_val {
            if let Some(py) = y(profile.vah) {
                hline(canvas, x0, x1, py, colors.vah, options.line_width, LineStyle::Dashed);
            }
            if let Some(py) = y(profile.val) {
                hline(canvas, x0, x1, py, colors.val, options.line_width, LineStyle::Dashed);
            }
        }

        if options.show_poor_extremes {
            if let Some(py) = profile.poor_high.and_then(y) {
                hline(canvas, x0, x1, py, colors.poor_high, options.line_width, LineStyle::Dashed);
            }
            if let Some(py) = profile.poor_low.and_then(y) {
                hline(canvas, x0, x1, py, colors.poor_low, options.line_width, LineStyle::Dashed);
            }
        }

        if options.show_midpoint {
            if let Some(py) = y(profile.midpoint) {
                hline(canvas, x0, x1, py, colors.midpoint, options.line_width, LineStyle::Dashed);
            }
        }

        if options.show_open_close {
            let marker = options.letter_width;
            if let Some(py) = y(profile.open_price) {
                canvas.line((x0 - marker, py), (x0, py), colors.open, options.line_width * 2.0, LineStyle::Solid);
            }
            if let Some(py) = y(profile.close_price) {
                canvas.line((x1, py), (x1 + marker, py), colors.close, options.line_width * 2.0, LineStyle::Solid);
            }
        }
    }

    fn draw_letters(
        &self,
        canvas: &mut dyn Canvas,
        scale: &dyn PriceScale,
        profile: &Profile,
        band: Band,
        row_height: f32,
    ) {
        let options = &self.options;
        let max = options.max_letters_visible.max(1);

        for level in &profile.price_levels {
            let Some(py) = scale.price_to_coordinate(level.price) else {
                continue;
            };

            for (i, letter) in level.letters.iter().take(max).enumerate() {
                let x = band.column_left(i);
                let color = color_for_letter(letter);
                match options.display {
                    TpoDisplay::Letters => canvas.text(x, py, &letter.label(), color, options.font_size),
                    TpoDisplay::Blocks => canvas.fill_rect(
                        Rect::from_ltwh(x, py - row_height / 2.0, options.letter_width, row_height),
                        color,
                    ),
                }
            }

            let hidden = level.letters.len().saturating_sub(max);
            if hidden > 0 {
                canvas.text(
                    band.column_left(max),
                    py,
                    &format!("+{}", hidden),
                    options.colors.text,
                    options.font_size,
                );
            }
        }
    }
}
