//! UC8151 e-paper controller, as fitted to the Badger 2040.
//!
//! Drawing goes to a [`Framebuffer`] in RAM; [`Uc8151::update`] sends it to
//! the panel and runs a full refresh.

use core::convert::Infallible;
use core::fmt;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;


/// Landscape size, the way the badge is worn
pub const WIDTH: u32 = 296;
pub const HEIGHT: u32 = 128;

/// Bytes per panel column of 128 pixels
const COLUMN_BYTES: usize = (HEIGHT / 8) as usize;
pub const BUFFER_SIZE: usize = WIDTH as usize * COLUMN_BYTES;

// Commands
const PSR: u8 = 0x00;
const PWR: u8 = 0x01;
const POF: u8 = 0x02;
const PFS: u8 = 0x03;
const PON: u8 = 0x04;
const BTST: u8 = 0x06;
const DTM2: u8 = 0x13;
const DSP: u8 = 0x11;
const DRF: u8 = 0x12;
const PLL: u8 = 0x30;
const TSE: u8 = 0x41;
const CDI: u8 = 0x50;
const TCON: u8 = 0x60;

// 128x296, OTP waveform, black/white, scan up, shift right, booster on, no soft reset
const PSR_SETTINGS: u8 = 0b1001_1111;
// Internal VDS/VDG, VCOM 16V, VDH/VDL/VDHR 11V
const PWR_SETTINGS: [u8; 5] = [0x03, 0x00, 0x2B, 0x2B, 0x2B];
// Soft start 10ms, strength 3, off time 6.58us for all phases
const BTST_SETTINGS: [u8; 3] = [0x17, 0x17, 0x17];
const PFS_ONE_FRAME: u8 = 0x00;
const TSE_INTERNAL: u8 = 0x00;
const TCON_SETTINGS: u8 = 0x22;
const CDI_SETTINGS: u8 = 0b0100_1100;
const PLL_100HZ: u8 = 0x3A;

const RESET_DELAY_MS: u32 = 10;
const BUSY_POLL_MS: u32 = 10;
/// A full refresh takes a little over a second
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// 1 bit per pixel, set bits are ink.
///
/// Stored in the panel's native order: one 16 byte column per landscape x,
/// most significant bit at the top.
pub struct Framebuffer {
    pixels: [u8; BUFFER_SIZE],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    pub const fn new() -> Self {
        Self {
            pixels: [0; BUFFER_SIZE],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    fn locate(point: Point) -> Option<(usize, u8)> {
        let (x, y) = (u32::try_from(point.x).ok()?, u32::try_from(point.y).ok()?);
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        let index = x as usize * COLUMN_BYTES + (y / 8) as usize;
        Some((index, 0x80 >> (y % 8)))
    }

    pub fn pixel(&self, point: Point) -> Option<BinaryColor> {
        let (index, mask) = Self::locate(point)?;
        Some(BinaryColor::from(self.pixels[index] & mask != 0))
    }

    pub fn set_pixel(&mut self, point: Point, color: BinaryColor) {
        if let Some((index, mask)) = Self::locate(point) {
            match color {
                BinaryColor::On => self.pixels[index] |= mask,
                BinaryColor::Off => self.pixels[index] &= !mask,
            }
        }
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        for point in area.points() {
            self.set_pixel(point, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = if color.is_on() { 0xFF } else { 0x00 };
        self.pixels.fill(fill);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uc8151Error<E> {
    Spi(E),
    /// A control pin could not be driven or read
    Pin,
    /// The panel stayed busy past the timeout
    Timeout,
}

impl<E: fmt::Debug> fmt::Display for Uc8151Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uc8151Error::Spi(e) => write!(f, "spi error: {:?}", e),
            Uc8151Error::Pin => f.write_str("control pin error"),
            Uc8151Error::Timeout => f.write_str("panel busy timeout"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Uc8151Error<E> {}

pub struct Uc8151<SPI, DC, RST, BUSY> {
    spi: SPI,
    dc: DC,
    reset: RST,
    /// Low while the controller is busy
    busy: BUSY,
}

impl<SPI, DC, RST, BUSY> Uc8151<SPI, DC, RST, BUSY>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
{
    pub fn new(spi: SPI, dc: DC, reset: RST, busy: BUSY) -> Self {
        Self {
            spi,
            dc,
            reset,
            busy,
        }
    }

    /// Hardware reset followed by the panel setup sequence.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Uc8151Error<SPI::Error>> {
        self.reset.set_low().map_err(|_| Uc8151Error::Pin)?;
        delay.delay_ms(RESET_DELAY_MS);
        self.reset.set_high().map_err(|_| Uc8151Error::Pin)?;
        delay.delay_ms(RESET_DELAY_MS);
        self.wait_until_idle(delay)?;

        self.command(PSR, &[PSR_SETTINGS])?;
        self.command(PWR, &PWR_SETTINGS)?;
        self.command(PON, &[])?;
        self.wait_until_idle(delay)?;
        self.command(BTST, &BTST_SETTINGS)?;
        self.command(PFS, &[PFS_ONE_FRAME])?;
        self.command(TSE, &[TSE_INTERNAL])?;
        self.command(TCON, &[TCON_SETTINGS])?;
        self.command(CDI, &[CDI_SETTINGS])?;
        self.command(PLL, &[PLL_100HZ])?;
        self.command(POF, &[])?;
        self.wait_until_idle(delay)?;
        debug!("UC8151 initialized");
        Ok(())
    }

    /// Sends `frame` and blocks until the refresh is done.
    pub fn update<D: DelayNs>(
        &mut self,
        frame: &Framebuffer,
        delay: &mut D,
    ) -> Result<(), Uc8151Error<SPI::Error>> {
        self.command(PON, &[])?;
        self.wait_until_idle(delay)?;
        self.command(DTM2, frame.as_bytes())?;
        self.command(DSP, &[])?;
        self.command(DRF, &[])?;
        self.wait_until_idle(delay)?;
        self.command(POF, &[])?;
        self.wait_until_idle(delay)
    }

    pub fn release(self) -> (SPI, DC, RST, BUSY) {
        (self.spi, self.dc, self.reset, self.busy)
    }

    fn command(&mut self, command: u8, data: &[u8]) -> Result<(), Uc8151Error<SPI::Error>> {
        self.dc.set_low().map_err(|_| Uc8151Error::Pin)?;
        self.spi.write(&[command]).map_err(Uc8151Error::Spi)?;
        if !data.is_empty() {
            self.dc.set_high().map_err(|_| Uc8151Error::Pin)?;
            self.spi.write(data).map_err(Uc8151Error::Spi)?;
        }
        Ok(())
    }

    fn wait_until_idle<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Uc8151Error<SPI::Error>> {
        for _ in 0..BUSY_TIMEOUT_MS / BUSY_POLL_MS {
            if self.busy.is_high().map_err(|_| Uc8151Error::Pin)? {
                return Ok(());
            }
            delay.delay_ms(BUSY_POLL_MS);
        }
        warn!("UC8151 still busy after {=u32}ms", BUSY_TIMEOUT_MS);
        Err(Uc8151Error::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    use embedded_graphics::primitives::PrimitiveStyle;
    use embedded_hal::digital::ErrorType as PinErrorType;
    use embedded_hal::spi::{ErrorKind, ErrorType as SpiErrorType, Operation};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Dc(bool),
        Reset(bool),
        Spi(Vec<u8>),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct FakeSpi(Log);

    impl SpiErrorType for FakeSpi {
        type Error = ErrorKind;
    }

    impl SpiDevice for FakeSpi {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.0.borrow_mut().push(Event::Spi(bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    struct FakePin {
        log: Log,
        event: fn(bool) -> Event,
    }

    impl PinErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.log.borrow_mut().push((self.event)(false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.log.borrow_mut().push((self.event)(true));
            Ok(())
        }
    }

    /// Reports busy for the first `busy_polls` reads
    struct BusyPin {
        busy_polls: u32,
    }

    impl PinErrorType for BusyPin {
        type Error = Infallible;
    }

    impl InputPin for BusyPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            if self.busy_polls > 0 {
                self.busy_polls -= 1;
                Ok(false)
            } else {
                Ok(true)
            }
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn panel(log: &Log, busy_polls: u32) -> Uc8151<FakeSpi, FakePin, FakePin, BusyPin> {
        Uc8151::new(
            FakeSpi(log.clone()),
            FakePin {
                log: log.clone(),
                event: Event::Dc,
            },
            FakePin {
                log: log.clone(),
                event: Event::Reset,
            },
            BusyPin { busy_polls },
        )
    }

    /// Groups the log into (command, data) pairs
    fn commands(log: &Log) -> Vec<(u8, Vec<u8>)> {
        let mut commands: Vec<(u8, Vec<u8>)> = Vec::new();
        let mut data_mode = false;
        for event in log.borrow().iter() {
            match event {
                Event::Dc(high) => data_mode = *high,
                Event::Spi(bytes) if data_mode => {
                    commands.last_mut().unwrap().1.extend_from_slice(bytes)
                }
                Event::Spi(bytes) => commands.push((bytes[0], Vec::new())),
                Event::Reset(_) => {}
            }
        }
        commands
    }

    #[test]
    fn init_resets_then_configures() {
        let log = Log::default();
        let mut epd = panel(&log, 0);
        epd.init(&mut NoDelay).unwrap();

        assert_eq!(log.borrow()[0], Event::Reset(false));
        assert_eq!(log.borrow()[1], Event::Reset(true));
        let sent = commands(&log);
        let order: Vec<u8> = sent.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, [PSR, PWR, PON, BTST, PFS, TSE, TCON, CDI, PLL, POF]);
        assert_eq!(sent[0].1, [PSR_SETTINGS]);
        assert_eq!(sent[1].1, PWR_SETTINGS);
    }

    #[test]
    fn update_streams_the_whole_frame() {
        let log = Log::default();
        let mut epd = panel(&log, 3);
        let mut frame = Framebuffer::new();
        frame.set_pixel(Point::new(0, 0), BinaryColor::On);
        epd.update(&frame, &mut NoDelay).unwrap();

        let sent = commands(&log);
        let order: Vec<u8> = sent.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, [PON, DTM2, DSP, DRF, POF]);
        assert_eq!(sent[1].1.len(), BUFFER_SIZE);
        assert_eq!(sent[1].1[0], 0x80);
    }

    #[test]
    fn stuck_busy_line_times_out() {
        let log = Log::default();
        let mut epd = panel(&log, u32::MAX);
        assert_eq!(
            epd.update(&Framebuffer::new(), &mut NoDelay),
            Err(Uc8151Error::Timeout)
        );
    }

    #[test]
    fn pixels_map_to_columns() {
        let mut frame = Framebuffer::new();
        frame.set_pixel(Point::new(1, 9), BinaryColor::On);
        assert_eq!(frame.as_bytes()[16 + 1], 0x40);
        assert_eq!(frame.pixel(Point::new(1, 9)), Some(BinaryColor::On));
        assert_eq!(frame.pixel(Point::new(1, 8)), Some(BinaryColor::Off));
        assert_eq!(frame.pixel(Point::new(296, 0)), None);
        assert_eq!(frame.pixel(Point::new(0, -1)), None);
        // Out of bounds writes are dropped
        frame.set_pixel(Point::new(-1, 500), BinaryColor::On);
        assert_eq!(frame.as_bytes().iter().map(|b| b.count_ones()).sum::<u32>(), 1);
    }

    #[test]
    fn draws_through_embedded_graphics() {
        let mut frame = Framebuffer::new();
        frame.clear(BinaryColor::Off).unwrap();
        Rectangle::new(Point::new(10, 0), Size::new(2, 128))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut frame)
            .unwrap();
        assert_eq!(frame.as_bytes()[10 * 16..12 * 16], [0xFF; 32]);
        assert_eq!(frame.pixel(Point::new(12, 64)), Some(BinaryColor::Off));

        frame.clear(BinaryColor::On).unwrap();
        assert!(frame.as_bytes().iter().all(|b| *b == 0xFF));
    }
}
