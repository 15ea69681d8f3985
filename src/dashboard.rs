//! Enviro+ screens: the readings dashboard and the network status screen.

use core::fmt::Write;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use heapless::String;

use crate::canvas::{draw_text, Canvas, Pen};
use crate::font::Bitmap8;
use crate::gas::GasRange;
use crate::sensors::SensorSnapshot;

/// Enviro+ ST7789 panel
pub const WIDTH: u32 = 240;
pub const HEIGHT: u32 = 240;

const HEADER_HEIGHT: u32 = 60;
const READING_SCALE: u8 = 3;
const CATEGORY_COLUMN: i32 = 125;
const GAS_BAR_WIDTH: u32 = 4;

/// What the dashboard has to show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Readout<'a> {
    /// This cycle's snapshot, drawn in full
    Fresh(&'a SensorSnapshot),
    /// The last good snapshot after a sensor fault: values only, no
    /// categories and no gas bar
    Stale(&'a SensorSnapshot),
    /// Nothing sampled yet
    Waiting,
}

/// What a dashboard render decided about the gas reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GasLevel {
    /// Position of the reading in the range seen so far, if it has one
    pub fraction: Option<f32>,
    /// Fraction under the alert threshold
    pub alert: bool,
}

/// Temperature colour: hot, cold or comfortable
pub fn temperature_pen(celsius: f32) -> Pen {
    if celsius > 30.0 {
        Pen::Red
    } else if celsius < 10.0 {
        Pen::Cyan
    } else {
        Pen::Green
    }
}

/// Draws the readings dashboard and reports whether gas is in alert.
pub fn render_dashboard<C: Canvas>(
    canvas: &mut C,
    readout: Readout<'_>,
    gas: &GasRange,
    gas_alert: f32,
) -> Result<GasLevel, C::Error> {
    let size = canvas.size();
    canvas.clear(Pen::Black)?;
    canvas.rectangle(
        Rectangle::new(Point::zero(), Size::new(size.width, HEADER_HEIGHT)),
        Pen::Grey,
    )?;

    let (snapshot, fresh) = match readout {
        Readout::Fresh(snapshot) => (snapshot, true),
        Readout::Stale(snapshot) => (snapshot, false),
        Readout::Waiting => {
            draw_text(canvas, &Bitmap8, "--.-°c", Point::new(5, 15), 4, Pen::White)?;
            draw_text(canvas, &Bitmap8, "waiting", Point::new(0, 75), READING_SCALE, Pen::White)?;
            canvas.update()?;
            return Ok(GasLevel::default());
        }
    };

    let mut line: String<24> = String::new();
    let _ = write!(line, "{:.1}°c", snapshot.temperature);
    draw_text(
        canvas,
        &Bitmap8,
        &line,
        Point::new(5, 15),
        4,
        temperature_pen(snapshot.temperature),
    )?;

    line.clear();
    let _ = write!(line, "rh {:.0}%", snapshot.humidity);
    draw_text(canvas, &Bitmap8, &line, Point::new(0, 75), READING_SCALE, Pen::White)?;
    line.clear();
    let _ = write!(line, "{:.0}hPa", snapshot.pressure);
    draw_text(canvas, &Bitmap8, &line, Point::new(0, 125), READING_SCALE, Pen::White)?;

    if !fresh {
        canvas.update()?;
        return Ok(GasLevel::default());
    }

    draw_text(
        canvas,
        &Bitmap8,
        snapshot.humidity_category.as_str(),
        Point::new(CATEGORY_COLUMN, 75),
        READING_SCALE,
        Pen::White,
    )?;
    draw_text(
        canvas,
        &Bitmap8,
        snapshot.pressure_category.as_str(),
        Point::new(CATEGORY_COLUMN, 125),
        READING_SCALE,
        Pen::White,
    )?;

    let fraction = gas.fraction(snapshot.gas_resistance);
    let mut level = GasLevel {
        fraction,
        alert: false,
    };
    if let Some(fraction) = fraction {
        level.alert = fraction < gas_alert;
        let pen = if level.alert { Pen::Red } else { Pen::Green };
        let bar = libm::roundf(fraction * size.height as f32) as u32;
        canvas.rectangle(
            Rectangle::new(
                Point::new(
                    size.width.saturating_sub(GAS_BAR_WIDTH) as i32,
                    size.height.saturating_sub(bar) as i32,
                ),
                Size::new(GAS_BAR_WIDTH, bar),
            ),
            pen,
        )?;
        draw_text(
            canvas,
            &Bitmap8,
            "gas",
            Point::new(185, 210),
            READING_SCALE,
            pen,
        )?;
    }

    canvas.update()?;
    Ok(level)
}

/// Progress of the uplink to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    Connecting,
    Connected,
    Failed,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Connecting => "Connecting...",
            LinkStatus::Connected => "Connection successful!",
            LinkStatus::Failed => "Connection failed!",
        }
    }
}

/// Full-screen uplink status shown while the station comes up.
pub fn render_status<C: Canvas>(
    canvas: &mut C,
    network: &str,
    status: LinkStatus,
    server: &str,
) -> Result<(), C::Error> {
    canvas.clear(Pen::Black)?;
    let mut line: String<64> = String::new();
    let _ = write!(line, "Network: {}", network);
    draw_text(canvas, &Bitmap8, &line, Point::new(10, 10), 2, Pen::White)?;
    draw_text(canvas, &Bitmap8, status.as_str(), Point::new(10, 30), 2, Pen::White)?;
    line.clear();
    let _ = write!(line, "Server: {}", server);
    draw_text(canvas, &Bitmap8, &line, Point::new(10, 60), 2, Pen::White)?;
    canvas.update()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::testing::{Op, Recorder};
    use crate::config::StationConfig;
    use crate::sensors::testing::{daylight, room};
    use crate::sensors::RawEnvironment;

    fn snapshot(raw: RawEnvironment) -> SensorSnapshot {
        SensorSnapshot::derive(raw, daylight(), 900, &StationConfig::default())
    }

    fn screen() -> Recorder {
        Recorder::new(WIDTH, HEIGHT)
    }

    #[test]
    fn fresh_readout_draws_values_and_categories() {
        let snapshot = snapshot(room());
        let mut canvas = screen();
        let level =
            render_dashboard(&mut canvas, Readout::Fresh(&snapshot), &GasRange::new(), 0.5)
                .unwrap();

        assert_eq!(canvas.ops[0], Op::Clear(Pen::Black));
        assert_eq!(
            canvas.ops[1],
            Op::Rectangle(Rectangle::new(Point::zero(), Size::new(240, 60)), Pen::Grey)
        );
        assert_eq!(
            canvas.find_text("19.0°c"),
            Some((Point::new(5, 15), 4.0, Pen::Green))
        );
        assert_eq!(
            canvas.find_text("rh 70%"),
            Some((Point::new(0, 75), 3.0, Pen::White))
        );
        assert!(canvas.find_text("1013hPa").is_some());
        assert_eq!(canvas.find_text("bad").unwrap().0, Point::new(125, 75));
        assert_eq!(canvas.find_text("fair").unwrap().0, Point::new(125, 125));
        assert_eq!(canvas.ops.last(), Some(&Op::Update));
        assert_eq!(level, GasLevel::default());
    }

    #[test]
    fn gas_bar_omitted_for_single_point_range() {
        let snapshot = snapshot(room());
        let gas = GasRange::new().widened(snapshot.gas_resistance);
        let mut canvas = screen();
        let level = render_dashboard(&mut canvas, Readout::Fresh(&snapshot), &gas, 0.5).unwrap();
        assert_eq!(level.fraction, None);
        assert!(!level.alert);
        assert!(canvas.find_text("gas").is_none());
        assert_eq!(canvas.rectangles().len(), 1);
    }

    #[test]
    fn low_gas_reading_is_an_alert() {
        let snapshot = snapshot(RawEnvironment {
            gas_resistance: 20_000.0,
            ..room()
        });
        let gas = GasRange::new().widened(10_000.0).widened(50_000.0);
        let mut canvas = screen();
        let level = render_dashboard(&mut canvas, Readout::Fresh(&snapshot), &gas, 0.5).unwrap();

        assert_eq!(level.fraction, Some(0.25));
        assert!(level.alert);
        let bar = Rectangle::new(Point::new(236, 180), Size::new(4, 60));
        assert!(canvas.rectangles().contains(&(bar, Pen::Red)));
        assert_eq!(canvas.find_text("gas"), Some((Point::new(185, 210), 3.0, Pen::Red)));
    }

    #[test]
    fn high_gas_reading_is_green() {
        let snapshot = snapshot(room());
        let gas = GasRange::new().widened(10_000.0).widened(50_000.0);
        let mut canvas = screen();
        let level = render_dashboard(&mut canvas, Readout::Fresh(&snapshot), &gas, 0.5).unwrap();
        assert_eq!(level.fraction, Some(1.0));
        assert!(!level.alert);
        let bar = Rectangle::new(Point::new(236, 0), Size::new(4, 240));
        assert!(canvas.rectangles().contains(&(bar, Pen::Green)));
    }

    #[test]
    fn gas_bar_on_a_sliver_of_a_canvas() {
        let snapshot = snapshot(room());
        let gas = GasRange::new().widened(10_000.0).widened(50_000.0);
        let mut canvas = Recorder::new(2, HEIGHT);
        render_dashboard(&mut canvas, Readout::Fresh(&snapshot), &gas, 0.5).unwrap();
        let bar = Rectangle::new(Point::new(0, 0), Size::new(4, HEIGHT));
        assert!(canvas.rectangles().contains(&(bar, Pen::Green)));
    }

    #[test]
    fn stale_readout_skips_categories_and_gas() {
        let snapshot = snapshot(room());
        let gas = GasRange::new().widened(10_000.0).widened(50_000.0);
        let mut canvas = screen();
        let level = render_dashboard(&mut canvas, Readout::Stale(&snapshot), &gas, 0.5).unwrap();
        assert!(canvas.find_text("19.0°c").is_some());
        assert!(canvas.find_text("bad").is_none());
        assert!(canvas.find_text("fair").is_none());
        assert!(canvas.find_text("gas").is_none());
        assert!(!level.alert);
    }

    #[test]
    fn temperature_colours() {
        assert_eq!(temperature_pen(30.5), Pen::Red);
        assert_eq!(temperature_pen(30.0), Pen::Green);
        assert_eq!(temperature_pen(10.0), Pen::Green);
        assert_eq!(temperature_pen(9.9), Pen::Cyan);
    }

    #[test]
    fn waiting_screen() {
        let mut canvas = screen();
        render_dashboard(&mut canvas, Readout::Waiting, &GasRange::new(), 0.5).unwrap();
        assert!(canvas.find_text("waiting").is_some());
    }

    #[test]
    fn status_screen_lines() {
        let mut canvas = screen();
        render_status(&mut canvas, "greenhouse", LinkStatus::Failed, "io.adafruit.com").unwrap();
        assert_eq!(canvas.ops[0], Op::Clear(Pen::Black));
        assert_eq!(
            canvas.find_text("Network: greenhouse"),
            Some((Point::new(10, 10), 2.0, Pen::White))
        );
        assert_eq!(canvas.find_text("Connection failed!").unwrap().0, Point::new(10, 30));
        assert_eq!(canvas.find_text("Server: io.adafruit.com").unwrap().0, Point::new(10, 60));
    }
}
