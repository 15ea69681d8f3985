#![no_std]
#![no_main]

use bsp::entry;
use defmt::*;
use defmt_rtt as _;
use embedded_graphics::geometry::Size;
use embedded_hal::digital::OutputPin;
use embedded_hal_bus::spi::ExclusiveDevice;
use panic_probe as _;

// Provide an alias for our BSP so we can switch targets quickly.
use rp_pico as bsp;

use bsp::hal::{
    self,
    clocks::{init_clocks_and_plls, Clock as _},
    fugit::RateExtU32,
    pac,
    watchdog::Watchdog,
    Timer,
};

use pico_badge_enviro::badge::{load_or_init, MemoryStore};
use pico_badge_enviro::canvas::GraphicsCanvas;
use pico_badge_enviro::layout::LayoutVariant;
use pico_badge_enviro::uc8151::{self, Framebuffer, Uc8151};

/// Bytes the badge record may take
const RECORD_CAPACITY: usize = 512;

#[entry]
fn main() -> ! {
    info!("Badge starting");
    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = Watchdog::new(pac.WATCHDOG);

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

    let sio = hal::Sio::new(pac.SIO);
    let pins = bsp::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut delay = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // Keep the board powered while running from battery
    let mut power = pins.gpio10.into_push_pull_output();
    power.set_high().unwrap();
    let mut led = pins.gpio25.into_push_pull_output();
    led.set_high().unwrap();

    // Set up the UC8151 on SPI0
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
        12_000_000u32.Hz(),
        embedded_hal::spi::MODE_0,
    );
    let cs = pins.gpio17.into_push_pull_output();
    let spi_device = ExclusiveDevice::new(spi, cs, delay).unwrap();
    let mut epd = Uc8151::new(
        spi_device,
        pins.gpio20.into_push_pull_output(),
        pins.gpio21.into_push_pull_output(),
        pins.gpio26.into_pull_up_input(),
    );
    epd.init(&mut delay).unwrap();

    // Load the badge record
    let mut store = match option_env!("BADGE_TEXT") {
        Some(text) => MemoryStore::<RECORD_CAPACITY>::with_contents(text).unwrap(),
        None => MemoryStore::new(),
    };
    let mut buf = [0u8; RECORD_CAPACITY];
    let record = load_or_init(&mut store, &mut buf).unwrap();
    info!("Badge for {}", record.display_name);

    let variant = match option_env!("BADGE_LAYOUT") {
        Some("greeting") => LayoutVariant::Greeting,
        _ => LayoutVariant::Flat,
    };
    let layout = variant.compute(&record, Size::new(uc8151::WIDTH, uc8151::HEIGHT));

    let mut canvas = GraphicsCanvas::new(Framebuffer::new());
    layout.draw(&mut canvas).unwrap();
    epd.update(canvas.target_mut(), &mut delay).unwrap();
    info!("Badge drawn");

    // The panel keeps its image without power
    led.set_low().unwrap();
    power.set_low().unwrap();
    loop {
        cortex_m::asm::wfi();
    }
}
