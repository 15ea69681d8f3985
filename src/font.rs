//! The built-in 5x7 font and its two typefaces.
//!
//! Glyphs are column-major, bit 0 is the top row. Text is drawn as square
//! dots, so the same glyphs serve both typefaces:
//! - [`Bitmap8`]: whole-number scale, an 8px cell per scale step
//! - [`Sans`]: fractional scale, 3px dots at scale 1.0

use crate::text_fit::TextMeasure;

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Glyph plus one column of spacing
pub const CELL_WIDTH: u32 = 6;
/// Glyph plus one row of spacing
pub const CELL_HEIGHT: u32 = 8;

const SANS_DOT: f32 = 3.0;

const DEGREE: [u8; 5] = [0x00, 0x06, 0x09, 0x09, 0x06];
const MISSING: [u8; 5] = [0x7F, 0x41, 0x41, 0x41, 0x7F];

// ASCII 0x20..=0x7E
static GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x01, 0x01], // F
    [0x3E, 0x41, 0x41, 0x51, 0x32], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x04, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x7F, 0x20, 0x18, 0x20, 0x7F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x03, 0x04, 0x78, 0x04, 0x03], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x00, 0x7F, 0x41, 0x41], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // \
    [0x41, 0x41, 0x7F, 0x00, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x08, 0x14, 0x54, 0x54, 0x3C], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x00, 0x7F, 0x10, 0x28, 0x44], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x02, 0x01, 0x02, 0x04, 0x02], // ~
];

/// Column bitmap for `ch`; unknown characters get a hollow box
pub fn glyph(ch: char) -> [u8; 5] {
    match ch {
        ' '..='~' => GLYPHS[ch as usize - 0x20],
        '°' => DEGREE,
        _ => MISSING,
    }
}

/// Width of `text` in dots, without trailing spacing
pub fn text_dots(text: &str) -> u32 {
    match text.chars().count() as u32 {
        0 => 0,
        n => n * CELL_WIDTH - 1,
    }
}

/// A [`TextMeasure`] that can also say how big its dots and lines are.
pub trait Typeface: TextMeasure {
    /// Edge length of one glyph dot in pixels
    fn dot_size(&self, scale: Self::Scale) -> f32;

    /// Pixel height of one line of text, spacing row included
    fn line_height(&self, scale: Self::Scale) -> u32 {
        libm::ceilf(CELL_HEIGHT as f32 * self.dot_size(scale)) as u32
    }
}

/// Integer-scaled bitmap font with an 8px line at scale 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bitmap8;

impl TextMeasure for Bitmap8 {
    type Scale = u8;

    fn measure(&self, text: &str, scale: u8) -> u32 {
        text_dots(text) * u32::from(scale)
    }
}

impl Typeface for Bitmap8 {
    fn dot_size(&self, scale: u8) -> f32 {
        f32::from(scale)
    }

    fn line_height(&self, scale: u8) -> u32 {
        CELL_HEIGHT * u32::from(scale)
    }
}

/// Freely scaled font for headline text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sans;

impl TextMeasure for Sans {
    type Scale = f32;

    fn measure(&self, text: &str, scale: f32) -> u32 {
        libm::roundf(text_dots(text) as f32 * self.dot_size(scale)) as u32
    }
}

impl Typeface for Sans {
    fn dot_size(&self, scale: f32) -> f32 {
        SANS_DOT * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_ascii_maps_into_table() {
        assert_eq!(glyph(' '), [0; 5]);
        assert_eq!(glyph('A'), [0x7E, 0x11, 0x11, 0x11, 0x7E]);
        assert_eq!(glyph('~'), GLYPHS[94]);
        assert_eq!(glyph('°'), DEGREE);
        assert_eq!(glyph('\u{2603}'), MISSING);
    }

    #[test]
    fn widths_count_chars_not_bytes() {
        assert_eq!(text_dots(""), 0);
        assert_eq!(text_dots("a"), 5);
        assert_eq!(text_dots("café"), 23);
    }

    #[test]
    fn bitmap_scales_linearly() {
        assert_eq!(Bitmap8.measure("Hello", 1), 29);
        assert_eq!(Bitmap8.measure("Hello", 3), 87);
        assert_eq!(Bitmap8.line_height(4), 32);
    }

    #[test]
    fn sans_rounds_to_whole_pixels() {
        // 9 chars = 53 dots, 6px each at 2.0
        assert_eq!(Sans.measure("H. Badger", 2.0), 318);
        assert_eq!(Sans.measure("H. Badger", 1.0), 159);
        assert_eq!(Sans.line_height(1.0), 24);
    }
}
