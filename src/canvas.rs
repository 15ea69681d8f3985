use embedded_graphics::pixelcolor::{BinaryColor, Rgb565};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::font::{glyph, Typeface, CELL_WIDTH, GLYPH_HEIGHT};

/// Drawing colours shared by both panels.
///
/// The e-paper badge only has ink or no ink: [`Pen::Black`] is ink,
/// everything else is paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pen {
    Black,
    White,
    Grey,
    Red,
    Green,
    Cyan,
}

/// Convert 8-bit RGB to Rgb565.
const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

impl From<Pen> for Rgb565 {
    fn from(pen: Pen) -> Self {
        match pen {
            Pen::Black => rgb(0, 0, 0),
            Pen::White => rgb(255, 255, 255),
            Pen::Grey => rgb(75, 75, 75),
            Pen::Red => rgb(255, 0, 0),
            Pen::Green => rgb(0, 255, 0),
            Pen::Cyan => rgb(0, 255, 255),
        }
    }
}

impl From<Pen> for BinaryColor {
    fn from(pen: Pen) -> Self {
        match pen {
            Pen::Black => BinaryColor::On,
            _ => BinaryColor::Off,
        }
    }
}

/// The drawing surface layouts and dashboards render to.
pub trait Canvas {
    type Error;

    fn size(&self) -> Size;

    fn clear(&mut self, pen: Pen) -> Result<(), Self::Error>;

    fn rectangle(&mut self, area: Rectangle, pen: Pen) -> Result<(), Self::Error>;

    /// Draws `text` with its top-left corner at `top_left`, each glyph dot
    /// `dot` pixels wide
    fn text(&mut self, text: &str, top_left: Point, dot: f32, pen: Pen)
        -> Result<(), Self::Error>;

    /// Pushes the frame out to the panel
    fn update(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Draws `text` in `font` at `scale`.
pub fn draw_text<C: Canvas, T: Typeface>(
    canvas: &mut C,
    font: &T,
    text: &str,
    top_left: Point,
    scale: T::Scale,
    pen: Pen,
) -> Result<(), C::Error> {
    canvas.text(text, top_left, font.dot_size(scale), pen)
}

/// [`Canvas`] over any embedded-graphics draw target.
pub struct GraphicsCanvas<D> {
    target: D,
}

impl<D> GraphicsCanvas<D> {
    pub fn new(target: D) -> Self {
        Self { target }
    }

    pub fn target_mut(&mut self) -> &mut D {
        &mut self.target
    }

    pub fn into_inner(self) -> D {
        self.target
    }
}

impl<D> Canvas for GraphicsCanvas<D>
where
    D: DrawTarget,
    D::Color: From<Pen>,
{
    type Error = D::Error;

    fn size(&self) -> Size {
        self.target.bounding_box().size
    }

    fn clear(&mut self, pen: Pen) -> Result<(), Self::Error> {
        self.target.clear(pen.into())
    }

    fn rectangle(&mut self, area: Rectangle, pen: Pen) -> Result<(), Self::Error> {
        self.target.fill_solid(&area, pen.into())
    }

    fn text(
        &mut self,
        text: &str,
        top_left: Point,
        dot: f32,
        pen: Pen,
    ) -> Result<(), Self::Error> {
        let color: D::Color = pen.into();
        let offset = |dots: u32| libm::roundf(dots as f32 * dot) as i32;
        let block = Size::new_equal(libm::ceilf(dot).max(1.0) as u32);

        for (n, ch) in text.chars().enumerate() {
            let cell_x = n as u32 * CELL_WIDTH;
            for (col, bits) in glyph(ch).iter().enumerate() {
                for row in 0..GLYPH_HEIGHT {
                    if (bits >> row) & 1 == 0 {
                        continue;
                    }
                    let at = top_left + Point::new(offset(cell_x + col as u32), offset(row));
                    self.target.fill_solid(&Rectangle::new(at, block), color)?;
                }
            }
        }
        Ok(())
    }
}
