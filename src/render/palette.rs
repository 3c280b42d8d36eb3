use std::sync::OnceLock;

use crate::market_profile::structs::{TpoLetter, LETTERS_PER_CYCLE};
use super::canvas::Color;

const PALETTE_SIZE: usize = LETTERS_PER_CYCLE as usize;

/// Gradient stops, earliest period first.
const STOPS: [Color; 6] = [
    Color::from_rgb(66, 133, 244),
    Color::from_rgb(0, 188, 212),
    Color::from_rgb(76, 175, 80),
    Color::from_rgb(255, 235, 59),
    Color::from_rgb(255, 152, 0),
    Color::from_rgb(233, 30, 99),
];

static LETTER_PALETTE: OnceLock<[Color; PALETTE_SIZE]> = OnceLock::new();

fn build_palette() -> [Color; PALETTE_SIZE] {
    let segments = (STOPS.len() - 1) as f32;
    std::array::from_fn(|i| {
        let position = i as f32 / (PALETTE_SIZE - 1) as f32 * segments;
        let segment = (position.floor() as usize).min(STOPS.len() - 2);
        STOPS[segment].lerp(STOPS[segment + 1], position - segment as f32)
    })
}

/// The 52 letter colors, interpolated once on first use.
pub fn letter_palette() -> &'static [Color; PALETTE_SIZE] {
    LETTER_PALETTE.get_or_init(build_palette)
}

/// Color of a period letter. Letters past `z` reuse the colors of their cycle position.
pub fn color_for_letter(letter: TpoLetter) -> Color {
    letter_palette()[letter.alphabet_position() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_endpoints() {
        let palette = letter_palette();
        assert_eq!(palette[0], STOPS[0]);
        assert_eq!(palette[PALETTE_SIZE - 1], STOPS[STOPS.len() - 1]);
    }

    #[test]
    fn test_colors_cycle_after_52_letters() {
        let a = color_for_letter(TpoLetter::from_index(0));
        let a2 = color_for_letter(TpoLetter::from_index(52));
        assert_eq!(a, a2);
        assert_ne!(a, color_for_letter(TpoLetter::from_index(30)));
    }

    #[test]
    fn test_palette_is_shared() {
        assert!(std::ptr::eq(letter_palette(), letter_palette()));
    }
}
