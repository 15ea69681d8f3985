//! The environmental station loop.
//!
//! Every iteration samples, renders the dashboard and, once per update
//! interval, publishes. All state that lives across iterations is kept in
//! [`Station`]; the hardware it drives is passed in through [`Peripherals`].

use embedded_hal::delay::DelayNs;

use crate::canvas::Canvas;
use crate::config::{StationConfig, TEMPERATURE_OFFSET_DARK, TEMPERATURE_OFFSET_LIT};
use crate::dashboard::{render_dashboard, render_status, GasLevel, LinkStatus, Readout};
use crate::error::{PublishFault, SensorFault, TopicTooLong};
use crate::gas::GasRange;
use crate::publish::{Broker, PublishOutcome, Publisher};
use crate::sensors::{EnvironmentSensor, LightSensor, Microphone, SensorSnapshot, Sensors};
use crate::timer::{Clock, BUTTON_DEBOUNCE_DELAY, TICK_TIME_DELAY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    A,
    B,
}

pub trait Buttons {
    /// The button held down right now, A winning if both are
    fn pressed(&mut self) -> Option<Button>;
}

/// Status LED colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorState {
    Off,
    /// Readings went out this iteration
    Published,
    /// Sensor fault, failed publish or bad air
    Alert,
}

impl IndicatorState {
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            IndicatorState::Off => (0, 0, 0),
            IndicatorState::Published => (0, 50, 0),
            IndicatorState::Alert => (255, 0, 0),
        }
    }
}

pub trait Indicator {
    fn show(&mut self, state: IndicatorState);
}

pub trait Backlight {
    fn set_backlight(&mut self, on: bool);
}

/// The hardware the loop drives besides its sensors.
pub struct Peripherals<C, B, K, I, L> {
    pub canvas: C,
    pub broker: B,
    pub buttons: K,
    pub indicator: I,
    pub backlight: L,
}

/// What happened during one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub sample: Result<(), SensorFault>,
    pub gas: GasLevel,
    /// `None` when sampling failed and publishing was not considered
    pub publish: Option<Result<PublishOutcome, PublishFault>>,
    pub indicator: IndicatorState,
}

/// Station state carried from one iteration to the next.
pub struct Station<'a, E, L, M> {
    sensors: Sensors<E, L, M>,
    config: StationConfig,
    gas: GasRange,
    publisher: Publisher<'a>,
    last: Option<SensorSnapshot>,
    publish_failed: bool,
    backlight: bool,
}

impl<'a, E, L, M> Station<'a, E, L, M>
where
    E: EnvironmentSensor,
    L: LightSensor,
    M: Microphone,
{
    /// The backlight starts on; the offset starts at the dark setting until a
    /// button picks one.
    pub fn new(
        sensors: Sensors<E, L, M>,
        config: StationConfig,
        topic_prefix: &'a str,
    ) -> Result<Self, TopicTooLong> {
        Ok(Self {
            sensors,
            publisher: Publisher::new(config.update_interval_ms(), topic_prefix)?,
            config,
            gas: GasRange::new(),
            last: None,
            publish_failed: false,
            backlight: true,
        })
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn gas_range(&self) -> &GasRange {
        &self.gas
    }

    pub fn last_snapshot(&self) -> Option<&SensorSnapshot> {
        self.last.as_ref()
    }

    pub fn last_publish_ms(&self) -> u64 {
        self.publisher.last_publish_ms()
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    pub fn sensors_mut(&mut self) -> &mut Sensors<E, L, M> {
        &mut self.sensors
    }

    /// A lights the screen, B darkens it. The screen warms the board, so the
    /// temperature offset follows the backlight. Returns the new backlight
    /// state.
    pub fn press(&mut self, button: Button) -> bool {
        let (backlight, offset) = match button {
            Button::A => (true, TEMPERATURE_OFFSET_LIT),
            Button::B => (false, TEMPERATURE_OFFSET_DARK),
        };
        self.backlight = backlight;
        self.config.temperature_offset = offset;
        info!("Button {}: offset now {}", button, offset);
        backlight
    }

    /// Sample, render, then publish if due.
    ///
    /// A sensor fault renders the last good values without categories and
    /// skips publishing. Nothing here stops the loop.
    pub fn tick<C: Canvas, B: Broker>(
        &mut self,
        now_ms: u64,
        canvas: &mut C,
        broker: &mut B,
    ) -> CycleReport {
        let sample = match self.sensors.sample_cycle(&self.config) {
            Ok(snapshot) => {
                self.gas.update(snapshot.gas_resistance);
                self.last = Some(snapshot);
                Ok(())
            }
            Err(fault) => {
                warn!("Sensor fault: {}", fault);
                Err(fault)
            }
        };

        let readout = match (&self.last, sample) {
            (Some(snapshot), Ok(())) => Readout::Fresh(snapshot),
            (Some(snapshot), Err(_)) => Readout::Stale(snapshot),
            (None, _) => Readout::Waiting,
        };
        let gas = render_dashboard(canvas, readout, &self.gas, self.config.gas_alert)
            .unwrap_or_else(|_| {
                error!("Dashboard draw failed");
                GasLevel::default()
            });

        let publish = match (&self.last, sample) {
            (Some(snapshot), Ok(())) => {
                Some(self.publisher.publish_cycle(broker, snapshot, now_ms))
            }
            _ => None,
        };
        match publish {
            Some(Ok(PublishOutcome::Published)) => self.publish_failed = false,
            Some(Err(fault)) => {
                warn!("Publish failed: {}", fault);
                self.publish_failed = true;
            }
            _ => {}
        }

        let indicator = if sample.is_err() || self.publish_failed || gas.alert {
            IndicatorState::Alert
        } else if publish == Some(Ok(PublishOutcome::Published)) {
            IndicatorState::Published
        } else {
            IndicatorState::Off
        };

        CycleReport {
            sample,
            gas,
            publish,
            indicator,
        }
    }

    /// One full loop iteration including buttons and delays.
    pub fn cycle<C, B, K, I, BL, D>(
        &mut self,
        io: &mut Peripherals<C, B, K, I, BL>,
        now_ms: u64,
        delay: &mut D,
    ) -> CycleReport
    where
        C: Canvas,
        B: Broker,
        K: Buttons,
        I: Indicator,
        BL: Backlight,
        D: DelayNs,
    {
        let report = self.tick(now_ms, &mut io.canvas, &mut io.broker);
        io.indicator.show(report.indicator);

        if let Some(button) = io.buttons.pressed() {
            let on = self.press(button);
            io.backlight.set_backlight(on);
            delay.delay_ms(BUTTON_DEBOUNCE_DELAY);
        }

        delay.delay_ms(TICK_TIME_DELAY);
        report
    }

    pub fn run<C, B, K, I, BL, T, D>(
        &mut self,
        io: &mut Peripherals<C, B, K, I, BL>,
        clock: &mut T,
        delay: &mut D,
    ) -> !
    where
        C: Canvas,
        B: Broker,
        K: Buttons,
        I: Indicator,
        BL: Backlight,
        T: Clock,
        D: DelayNs,
    {
        info!("Station loop running");
        loop {
            let now = clock.now_ms();
            self.cycle(io, now, delay);
        }
    }
}

/// Shows the uplink status screen while checking the broker can be reached.
pub fn check_uplink<C: Canvas, B: Broker>(
    canvas: &mut C,
    broker: &mut B,
    network: &str,
    server: &str,
) -> LinkStatus {
    if render_status(canvas, network, LinkStatus::Connecting, server).is_err() {
        error!("Status screen draw failed");
    }
    let status = match broker.connect() {
        Ok(()) => {
            let _ = broker.disconnect();
            LinkStatus::Connected
        }
        Err(_) => LinkStatus::Failed,
    };
    info!("Uplink: {}", status.as_str());
    if render_status(canvas, network, status, server).is_err() {
        error!("Status screen draw failed");
    }
    status
}
