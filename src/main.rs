#![no_std]
#![no_main]

use bme680::{
    Bme680, I2CAddress, IIRFilterSize, OversamplingSetting, PowerMode, SettingsBuilder,
};
use bsp::entry;
use core::cell::RefCell;
use core::time::Duration;
use defmt::*;
use defmt_rtt as _;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_0_2::adc::OneShot;
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_bus::spi::ExclusiveDevice;
use i2c_pio::I2C;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::ColorInversion;
use mipidsi::Builder;
use panic_probe as _;

// Provide an alias for our BSP so we can switch targets quickly.
use rp_pico as bsp;

use bsp::hal::{
    self,
    clocks::{init_clocks_and_plls, Clock as _},
    fugit::RateExtU32,
    gpio::bank0::{Gpio0, Gpio1, Gpio10, Gpio12, Gpio13, Gpio20, Gpio26, Gpio4, Gpio5, Gpio6, Gpio7},
    gpio::{FunctionNull, FunctionSio, FunctionUart, Pin, PullDown, PullNone, PullUp, SioInput, SioOutput},
    pac,
    pio::{PIOExt, SM0},
    uart::{DataBits, Enabled, StopBits, UartConfig, UartPeripheral},
    watchdog::Watchdog,
    Timer,
};
use pac::{PIO0, UART0};

use pico_badge_enviro::canvas::GraphicsCanvas;
use pico_badge_enviro::config::{
    MqttConfig, StationConfig, MQTT_TOPIC_PREFIX, NETWORK_NAME, SERVER_ADDRESS,
};
use pico_badge_enviro::dashboard;
use pico_badge_enviro::ltr559::Ltr559;
use pico_badge_enviro::mqtt::MqttClient;
use pico_badge_enviro::sensors::{EnvironmentSensor, Microphone, RawEnvironment, Sensors};
use pico_badge_enviro::station::{
    check_uplink, Backlight, Button, Buttons, Indicator, IndicatorState, Peripherals, Station,
};
use pico_badge_enviro::timer::Clock;

/// How long the bridge gets to answer a packet
const REPLY_TIMEOUT_US: u64 = 5_000_000;
const BRIDGE_BAUD: u32 = 115_200;

type PioI2c<'a> = I2C<'a, PIO0, SM0, Pin<Gpio4, FunctionNull, PullDown>, Pin<Gpio5, FunctionNull, PullDown>>;
type BusDevice<'b, 'p> = RefCellDevice<'b, PioI2c<'p>>;
type BridgeUart = UartPeripheral<
    Enabled,
    UART0,
    (
        Pin<Gpio0, FunctionUart, PullDown>,
        Pin<Gpio1, FunctionUart, PullDown>,
    ),
>;

#[entry]
fn main() -> ! {
    info!("Enviro station starting");
    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock
    let clocks = init_clocks_and_plls(
        bsp::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = bsp::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut delay = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // Set up the RGB LED, red until the first good cycle
    let mut led = RgbLed {
        red: pins.gpio6.into_push_pull_output(),
        green: pins.gpio7.into_push_pull_output(),
        blue: pins.gpio10.into_push_pull_output(),
    };
    led.show(IndicatorState::Alert);

    // Set up the ST7789 on SPI0
    let spi = hal::Spi::<_, _, _, 8>::new(
        pac.SPI0,
        (
            pins.gpio19.into_function::<hal::gpio::FunctionSpi>(),
            pins.gpio18.into_function::<hal::gpio::FunctionSpi>(),
        ),
    )
    .init(
        &mut pac.RESETS,
        clocks.peripheral_clock.freq(),
        62_500_000u32.Hz(),
        embedded_hal::spi::MODE_0,
    );
    let cs = pins.gpio17.into_push_pull_output();
    let spi_device = ExclusiveDevice::new(spi, cs, delay).unwrap();
    let dc = pins.gpio16.into_push_pull_output();
    let mut spi_buffer = [0u8; 512];
    let di = SpiInterface::new(spi_device, dc, &mut spi_buffer);
    let display = Builder::new(ST7789, di)
        .display_size(dashboard::WIDTH as u16, dashboard::HEIGHT as u16)
        .invert_colors(ColorInversion::Inverted)
        .init(&mut delay)
        .unwrap();
    let mut canvas = GraphicsCanvas::new(display);

    let mut backlight = Screen(pins.gpio20.into_push_pull_output());
    backlight.set_backlight(true);

    // Set up the shared I2C bus on the breakout garden pins
    let (mut pio, sm0, _, _, _) = pac.PIO0.split(&mut pac.RESETS);
    let i2c_pio = I2C::new(
        &mut pio,
        pins.gpio4,
        pins.gpio5,
        sm0,
        100.kHz(),
        clocks.system_clock.freq(),
    );
    let bus = RefCell::new(i2c_pio);

    // Set up BME688
    let mut bme = Bme680::init(
        I2cCompat(RefCellDevice::new(&bus)),
        &mut delay,
        I2CAddress::Secondary,
    )
    .unwrap();
    let settings = SettingsBuilder::new()
        .with_humidity_oversampling(OversamplingSetting::OS2x)
        .with_pressure_oversampling(OversamplingSetting::OS4x)
        .with_temperature_oversampling(OversamplingSetting::OS8x)
        .with_temperature_filter(IIRFilterSize::Size3)
        .with_gas_measurement(Duration::from_millis(1500), 320, 25)
        .with_run_gas(true)
        .build();
    bme.set_sensor_settings(&mut delay, settings).unwrap();

    // Set up LTR559
    let mut ltr = Ltr559::new(RefCellDevice::new(&bus));
    ltr.init().unwrap();

    // Set up the microphone
    let adc = hal::Adc::new(pac.ADC, &mut pac.RESETS);
    let mic_pin = hal::adc::AdcPin::new(pins.gpio26.into_floating_input()).unwrap();
    let mic = Mic { adc, pin: mic_pin };

    // Set up the link to the serial-to-TCP bridge
    let uart = UartPeripheral::new(
        pac.UART0,
        (pins.gpio0.into_function(), pins.gpio1.into_function()),
        &mut pac.RESETS,
    )
    .enable(
        UartConfig::new(BRIDGE_BAUD.Hz(), DataBits::Eight, None, StopBits::One),
        clocks.peripheral_clock.freq(),
    )
    .unwrap();
    let mut mqtt = MqttClient::new(BridgeLink { uart, timer: delay }, MqttConfig::default());

    check_uplink(&mut canvas, &mut mqtt, NETWORK_NAME, SERVER_ADDRESS);

    let mut sensors = Sensors::new(Bme68x { bme, delay }, ltr, mic);
    sensors.warm_up(&mut delay);

    let mut station = Station::new(sensors, StationConfig::default(), MQTT_TOPIC_PREFIX).unwrap();

    // Set up buttons
    let buttons = PanelButtons {
        a: pins.gpio12.into_pull_up_input(),
        b: pins.gpio13.into_pull_up_input(),
    };

    let mut io = Peripherals {
        canvas,
        broker: mqtt,
        buttons,
        indicator: led,
        backlight,
    };

    info!("Enviro station ready");
    station.run(&mut io, &mut Uptime(delay), &mut delay)
}

/// Milliseconds since boot from the RP2040 timer
struct Uptime(Timer);

impl Clock for Uptime {
    fn now_ms(&mut self) -> u64 {
        self.0.get_counter().ticks() / 1_000
    }
}

#[derive(Format)]
struct BusError;

/// BME68x in forced mode: every read triggers one measurement
struct Bme68x<'b, 'p> {
    bme: Bme680<I2cCompat<BusDevice<'b, 'p>>, Timer>,
    delay: Timer,
}

impl EnvironmentSensor for Bme68x<'_, '_> {
    type Error = BusError;

    fn read(&mut self) -> Result<RawEnvironment, BusError> {
        self.bme
            .set_sensor_mode(&mut self.delay, PowerMode::ForcedMode)
            .map_err(|_| BusError)?;
        let (data, _) = self
            .bme
            .get_sensor_data(&mut self.delay)
            .map_err(|_| BusError)?;
        Ok(RawEnvironment {
            temperature: data.temperature_celsius(),
            pressure: data.pressure_hpa() * 100.0,
            humidity: data.humidity_percent(),
            gas_resistance: data.gas_resistance_ohm() as f32,
            heater_stable: data.heat_stable(),
        })
    }
}

/// Microphone on ADC0
struct Mic {
    adc: hal::Adc,
    pin: hal::adc::AdcPin<Pin<Gpio26, FunctionSio<SioInput>, PullNone>>,
}

impl Microphone for Mic {
    type Error = BusError;

    fn read(&mut self) -> Result<u16, BusError> {
        let sample: u16 = self.adc.read(&mut self.pin).map_err(|_| BusError)?;
        // 12-bit conversion scaled to full u16
        Ok(sample << 4)
    }
}

/// Common anode RGB LED, a low pin lights its colour
struct RgbLed {
    red: Pin<Gpio6, FunctionSio<SioOutput>, PullDown>,
    green: Pin<Gpio7, FunctionSio<SioOutput>, PullDown>,
    blue: Pin<Gpio10, FunctionSio<SioOutput>, PullDown>,
}

impl Indicator for RgbLed {
    fn show(&mut self, state: IndicatorState) {
        let (r, g, b) = state.rgb();
        let _ = self.red.set_state((r == 0).into());
        let _ = self.green.set_state((g == 0).into());
        let _ = self.blue.set_state((b == 0).into());
    }
}

/// Display backlight on GPIO20
struct Screen(Pin<Gpio20, FunctionSio<SioOutput>, PullDown>);

impl Backlight for Screen {
    fn set_backlight(&mut self, on: bool) {
        let _ = self.0.set_state(on.into());
    }
}

/// Buttons A and B, pulled up, pressed when low
struct PanelButtons {
    a: Pin<Gpio12, FunctionSio<SioInput>, PullUp>,
    b: Pin<Gpio13, FunctionSio<SioInput>, PullUp>,
}

impl Buttons for PanelButtons {
    fn pressed(&mut self) -> Option<Button> {
        if self.a.is_low().unwrap_or(false) {
            Some(Button::A)
        } else if self.b.is_low().unwrap_or(false) {
            Some(Button::B)
        } else {
            None
        }
    }
}

/// UART to the serial-to-TCP bridge.
/// Reads give up after REPLY_TIMEOUT_US so a dead bridge cannot stall the loop.
struct BridgeLink {
    uart: BridgeUart,
    timer: Timer,
}

impl embedded_io::ErrorType for BridgeLink {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for BridgeLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let deadline = self.timer.get_counter().ticks() + REPLY_TIMEOUT_US;
        while !self.uart.uart_is_readable() {
            if self.timer.get_counter().ticks() > deadline {
                warn!("Bridge did not answer");
                return Ok(0);
            }
        }
        embedded_io::Read::read(&mut self.uart, buf).map_err(|_| embedded_io::ErrorKind::Other)
    }
}

impl embedded_io::Write for BridgeLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.write_full_blocking(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// --- Bridge for embedded-hal 1.0 -> 0.2.7, the bme680 crate still uses 0.2 ---
struct I2cCompat<I2C>(I2C);

impl<I2C> embedded_hal_0_2::blocking::i2c::Write for I2cCompat<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    type Error = I2C::Error;
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.0.write(addr, bytes)
    }
}

impl<I2C> embedded_hal_0_2::blocking::i2c::Read for I2cCompat<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    type Error = I2C::Error;
    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.0.read(addr, buffer)
    }
}

impl<I2C> embedded_hal_0_2::blocking::i2c::WriteRead for I2cCompat<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    type Error = I2C::Error;
    fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.0.write_read(addr, bytes, buffer)
    }
}
