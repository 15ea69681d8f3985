//! Badge layouts.
//!
//! The canvas is cut into horizontal bands stacked top to bottom: a dark
//! header band, then a light panel holding the name, handle and (for the
//! greeting layout) pronouns. Every line is fitted to the panel width with
//! the helpers in [`crate::text_fit`].

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use heapless::Vec;

use crate::badge::BadgeRecord;
use crate::canvas::{draw_text, Canvas, Pen};
use crate::font::{Bitmap8, Sans, Typeface, GLYPH_HEIGHT};
use crate::text_fit::{
    shrink_to_fit, truncate_to_width, ShrinkPolicy, TextMeasure, HANDLE_SHRINK, NAME_SHRINK,
    PRONOUNS_SHRINK,
};

/// Badger 2040 panel
pub const WIDTH: u32 = 296;
pub const HEIGHT: u32 = 128;

/// Scale of the organization line, which is truncated rather than shrunk
pub const COMPANY_TEXT_SIZE: u8 = 3;
/// Extra room kept either side of the display name
pub const NAME_PADDING: u32 = 20;
/// Nudge applied to the bitmap lines after centering
const LINE_OFFSET: i32 = 2;

const FLAT_HEADER_HEIGHT: u32 = 32;
const GREETING_HEADER_HEIGHT: u32 = 48;
const GREETING: &str = "Hello";
const GREETING_SUBTITLE: &str = "my name is";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SizePolicy {
    /// Text is drawn at one size, cut short if needed
    Fixed,
    /// Text is scaled down until it fits
    ShrinkToFit,
}

/// A horizontal strip of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayoutBand {
    pub origin_y: u32,
    pub height: u32,
    pub policy: SizePolicy,
}

impl LayoutBand {
    pub fn new(origin_y: u32, height: u32, policy: SizePolicy) -> Self {
        Self {
            origin_y,
            height,
            policy,
        }
    }

    /// First row below the band
    pub fn end(&self) -> u32 {
        self.origin_y + self.height
    }

    /// Top edge that vertically centers `content` pixels in the band
    fn centered(&self, content: u32) -> i32 {
        self.origin_y as i32 + (self.height as i32 - content as i32) / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextScale {
    Bitmap(u8),
    Sans(f32),
}

/// One line of text with its final position and size.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlacedText<'a> {
    pub text: &'a str,
    pub top_left: Point,
    pub scale: TextScale,
    pub width: u32,
    pub pen: Pen,
}

/// Which arrangement of the badge fields to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutVariant {
    /// Organization header over name and handle halves
    #[default]
    Flat,
    /// "Hello, my name is" header over name, pronouns and handle
    Greeting,
}

/// Header plus up to three panel bands
pub const MAX_BANDS: usize = 4;
/// Two greeting banner lines, name, pronouns and handle
pub const MAX_LINES: usize = 5;

/// Appends to a fixed capacity list sized for the largest variant.
fn place<T, const N: usize>(list: &mut Vec<T, N>, item: T) {
    let placed = list.push(item).is_ok();
    debug_assert!(placed, "layout holds at most {} entries", N);
}

/// A computed badge, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeLayout<'a> {
    pub size: Size,
    /// Header first, then the panel bands top to bottom
    pub bands: Vec<LayoutBand, MAX_BANDS>,
    /// Light background behind the panel bands
    pub panel: Rectangle,
    pub texts: Vec<PlacedText<'a>, MAX_LINES>,
}

impl LayoutVariant {
    pub fn compute<'a>(self, record: &BadgeRecord<'a>, size: Size) -> BadgeLayout<'a> {
        match self {
            LayoutVariant::Flat => flat(record, size),
            LayoutVariant::Greeting => greeting(record, size),
        }
    }
}

impl<'a> BadgeLayout<'a> {
    pub fn draw<C: Canvas>(&self, canvas: &mut C) -> Result<(), C::Error> {
        canvas.clear(Pen::Black)?;
        canvas.rectangle(self.panel, Pen::White)?;
        for line in &self.texts {
            match line.scale {
                TextScale::Bitmap(scale) => {
                    draw_text(canvas, &Bitmap8, line.text, line.top_left, scale, line.pen)?
                }
                TextScale::Sans(scale) => {
                    draw_text(canvas, &Sans, line.text, line.top_left, scale, line.pen)?
                }
            }
        }
        canvas.update()
    }

    pub fn text(&self, text: &str) -> Option<&PlacedText<'a>> {
        self.texts.iter().find(|line| line.text == text)
    }
}

struct Frame {
    size: Size,
    text_width: u32,
    header: LayoutBand,
    rest_height: u32,
}

impl Frame {
    fn new(size: Size, header_height: u32) -> Self {
        Frame {
            size,
            text_width: size.width.saturating_sub(2),
            header: LayoutBand::new(0, header_height, SizePolicy::Fixed),
            rest_height: size.height.saturating_sub(header_height + 2),
        }
    }

    fn panel(&self) -> Rectangle {
        Rectangle::new(
            Point::new(1, self.header.end() as i32 + 1),
            Size::new(self.text_width, self.rest_height),
        )
    }

    fn panel_top(&self) -> u32 {
        self.header.end() + 1
    }

    /// Centered on the whole canvas, as the header lines are
    fn header_line<'a>(&self, text: &'a str, scale: u8, y: i32) -> PlacedText<'a> {
        let width = Bitmap8.measure(text, scale);
        PlacedText {
            text,
            top_left: Point::new(self.size.width as i32 / 2 - width as i32 / 2, y),
            scale: TextScale::Bitmap(scale),
            width,
            pen: Pen::White,
        }
    }

    fn name_line<'a>(&self, name: &'a str, band: &LayoutBand) -> PlacedText<'a> {
        // Never start taller than the band, rounded down to a whole step
        let tallest = band.height as f32 / (GLYPH_HEIGHT as f32 * Sans.dot_size(1.0));
        let tallest = libm::floorf(tallest / NAME_SHRINK.step) * NAME_SHRINK.step;
        let policy = ShrinkPolicy {
            start: NAME_SHRINK.start.min(tallest).max(NAME_SHRINK.floor),
            ..NAME_SHRINK
        };
        let fit = shrink_to_fit(
            &Sans,
            name,
            policy,
            self.text_width.saturating_sub(NAME_PADDING),
        );
        let ink = libm::ceilf(GLYPH_HEIGHT as f32 * Sans.dot_size(fit.scale)) as u32;
        PlacedText {
            text: name,
            top_left: Point::new(
                (self.text_width as i32 - fit.width as i32) / 2,
                band.centered(ink),
            ),
            scale: TextScale::Sans(fit.scale),
            width: fit.width,
            pen: Pen::Black,
        }
    }

    fn bitmap_line<'a>(&self, text: &'a str, scale: u8, y: i32) -> PlacedText<'a> {
        let width = Bitmap8.measure(text, scale);
        PlacedText {
            text,
            top_left: Point::new((self.text_width as i32 - width as i32) / 2 + LINE_OFFSET, y),
            scale: TextScale::Bitmap(scale),
            width,
            pen: Pen::Black,
        }
    }
}

fn flat<'a>(record: &BadgeRecord<'a>, size: Size) -> BadgeLayout<'a> {
    let frame = Frame::new(size, FLAT_HEADER_HEIGHT);
    let half = frame.rest_height / 2;
    let name_band = LayoutBand::new(frame.panel_top(), half, SizePolicy::ShrinkToFit);
    let handle_band = LayoutBand::new(name_band.end(), half, SizePolicy::ShrinkToFit);

    let company = truncate_to_width(
        &Bitmap8,
        record.organization,
        COMPANY_TEXT_SIZE,
        frame.text_width,
    );
    let handle = shrink_to_fit(&Bitmap8, record.handle, HANDLE_SHRINK, frame.text_width);

    let mut bands = Vec::new();
    let mut texts = Vec::new();
    for band in [frame.header, name_band, handle_band] {
        place(&mut bands, band);
    }
    let company_y = ((COMPANY_TEXT_SIZE as i32 - 1) * 8) / 2;
    for line in [
        frame.header_line(company, COMPANY_TEXT_SIZE, company_y),
        frame.name_line(record.display_name, &name_band),
        frame.bitmap_line(
            record.handle,
            handle.scale,
            handle_band.centered(Bitmap8.line_height(handle.scale)),
        ),
    ] {
        place(&mut texts, line);
    }

    BadgeLayout {
        size,
        bands,
        panel: frame.panel(),
        texts,
    }
}

/// Pronoun and handle sizes are settled first, the name gets what is left.
fn greeting<'a>(record: &BadgeRecord<'a>, size: Size) -> BadgeLayout<'a> {
    let frame = Frame::new(size, GREETING_HEADER_HEIGHT);

    let handle = shrink_to_fit(&Bitmap8, record.handle, HANDLE_SHRINK, frame.text_width);
    let handle_height = Bitmap8.line_height(handle.scale);
    let pronouns = record
        .pronouns
        .map(|text| (text, shrink_to_fit(&Bitmap8, text, PRONOUNS_SHRINK, frame.text_width)));
    let pronouns_height = pronouns.map_or(0, |(_, fit)| Bitmap8.line_height(fit.scale));
    let name_height = frame
        .rest_height
        .saturating_sub(handle_height + pronouns_height);

    let name_band = LayoutBand::new(frame.panel_top(), name_height, SizePolicy::ShrinkToFit);
    let pronouns_band = LayoutBand::new(name_band.end(), pronouns_height, SizePolicy::ShrinkToFit);
    let handle_band = LayoutBand::new(pronouns_band.end(), handle_height, SizePolicy::ShrinkToFit);

    let mut bands = Vec::new();
    let mut texts = Vec::new();
    place(&mut bands, frame.header);
    place(&mut bands, name_band);
    if pronouns.is_some() {
        place(&mut bands, pronouns_band);
    }
    place(&mut bands, handle_band);

    place(&mut texts, frame.header_line(GREETING, 3, 8));
    place(&mut texts, frame.header_line(GREETING_SUBTITLE, 2, 24 + 8));
    place(&mut texts, frame.name_line(record.display_name, &name_band));
    if let Some((text, fit)) = pronouns {
        place(&mut texts, frame.bitmap_line(text, fit.scale, pronouns_band.origin_y as i32));
    }
    place(&mut texts, frame.bitmap_line(record.handle, handle.scale, handle_band.origin_y as i32));

    BadgeLayout {
        size,
        bands,
        panel: frame.panel(),
        texts,
    }
}
