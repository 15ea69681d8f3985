//! Sensor capabilities and the per-loop sampling cycle.
//!
//! The station only talks to its sensors through the three traits here, so
//! the loop runs the same against real drivers and test fakes.

use embedded_hal::delay::DelayNs;

use crate::climate::{
    adjust_to_sea_pressure, correct, describe_humidity, describe_pressure, HumidityCategory,
    PressureCategory,
};
use crate::config::StationConfig;
use crate::error::SensorFault;
use crate::timer::WARM_UP_DELAY;

/// Readings discarded before the loop starts
pub const WARM_UP_READINGS: usize = 2;

/// One reading from the BME68x, uncorrected.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawEnvironment {
    /// °C
    pub temperature: f32,
    /// Pa
    pub pressure: f32,
    /// % relative humidity
    pub humidity: f32,
    /// Ω
    pub gas_resistance: f32,
    pub heater_stable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightReading {
    pub lux: f32,
    pub proximity: u16,
}

/// Temperature, pressure, humidity and gas.
pub trait EnvironmentSensor {
    type Error;

    fn read(&mut self) -> Result<RawEnvironment, Self::Error>;
}

/// Ambient light and proximity.
pub trait LightSensor {
    type Error;

    /// `None` when no new reading is ready
    fn read(&mut self) -> Result<Option<LightReading>, Self::Error>;
}

/// Raw microphone amplitude, full scale `u16`.
pub trait Microphone {
    type Error;

    fn read(&mut self) -> Result<u16, Self::Error>;
}

/// One sampling cycle, raw and derived.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSnapshot {
    pub raw: RawEnvironment,
    /// °C, self-heating removed
    pub temperature: f32,
    pub dew_point: f32,
    /// % relative humidity at the corrected temperature
    pub humidity: f32,
    /// hPa, adjusted to sea level
    pub pressure: f32,
    pub gas_resistance: f32,
    pub lux: f32,
    pub proximity: u16,
    pub microphone: u16,
    pub pressure_category: PressureCategory,
    /// Judged on the corrected humidity above, not the raw sensor value
    pub humidity_category: HumidityCategory,
}

impl SensorSnapshot {
    pub fn derive(
        raw: RawEnvironment,
        light: LightReading,
        microphone: u16,
        config: &StationConfig,
    ) -> Self {
        let corrected = correct(raw.temperature, raw.humidity, config.temperature_offset);
        let pressure =
            adjust_to_sea_pressure(raw.pressure / 100.0, corrected.temperature, config.altitude);
        SensorSnapshot {
            raw,
            temperature: corrected.temperature,
            dew_point: corrected.dew_point,
            humidity: corrected.humidity,
            pressure,
            gas_resistance: raw.gas_resistance,
            lux: light.lux,
            proximity: light.proximity,
            microphone,
            pressure_category: describe_pressure(pressure),
            humidity_category: describe_humidity(corrected.humidity),
        }
    }
}

/// The station's three sensors.
pub struct Sensors<E, L, M> {
    pub environment: E,
    pub light: L,
    pub microphone: M,
}

impl<E, L, M> Sensors<E, L, M>
where
    E: EnvironmentSensor,
    L: LightSensor,
    M: Microphone,
{
    pub fn new(environment: E, light: L, microphone: M) -> Self {
        Self {
            environment,
            light,
            microphone,
        }
    }

    /// Throws away the first gas readings, which are off until the heater
    /// has cycled a couple of times.
    pub fn warm_up<D: DelayNs>(&mut self, delay: &mut D) {
        for n in 0..WARM_UP_READINGS {
            if self.environment.read().is_err() {
                warn!("Warm-up reading {} failed", n);
            }
            delay.delay_ms(WARM_UP_DELAY);
        }
        debug!("Sensors warmed up");
    }

    /// Reads every sensor and derives the snapshot.
    ///
    /// All three sensors are read before the result is judged, so a fault
    /// never leaves a sensor with a pending conversion.
    pub fn sample_cycle(&mut self, config: &StationConfig) -> Result<SensorSnapshot, SensorFault> {
        let raw = self.environment.read().map_err(|_| SensorFault::Environment);
        let light = self.light.read().map_err(|_| SensorFault::Light);
        let microphone = self.microphone.read().map_err(|_| SensorFault::Microphone);

        let raw = raw?;
        let light = light?;
        let microphone = microphone?;

        if !raw.heater_stable {
            return Err(SensorFault::HeaterUnstable);
        }
        let light = light.ok_or(SensorFault::LightMissing)?;
        Ok(SensorSnapshot::derive(raw, light, microphone, config))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub struct FakeEnvironment {
        pub reading: Result<RawEnvironment, ()>,
        pub reads: usize,
    }

    impl FakeEnvironment {
        pub fn new(reading: RawEnvironment) -> Self {
            Self {
                reading: Ok(reading),
                reads: 0,
            }
        }
    }

    impl EnvironmentSensor for FakeEnvironment {
        type Error = ();

        fn read(&mut self) -> Result<RawEnvironment, ()> {
            self.reads += 1;
            self.reading
        }
    }

    pub struct FakeLight(pub Option<LightReading>);

    impl LightSensor for FakeLight {
        type Error = ();

        fn read(&mut self) -> Result<Option<LightReading>, ()> {
            Ok(self.0)
        }
    }

    pub struct FakeMicrophone(pub u16);

    impl Microphone for FakeMicrophone {
        type Error = ();

        fn read(&mut self) -> Result<u16, ()> {
            Ok(self.0)
        }
    }

    pub fn room() -> RawEnvironment {
        RawEnvironment {
            temperature: 22.0,
            pressure: 101_300.0,
            humidity: 55.0,
            gas_resistance: 50_000.0,
            heater_stable: true,
        }
    }

    pub fn daylight() -> LightReading {
        LightReading {
            lux: 320.5,
            proximity: 3,
        }
    }

    pub fn station_sensors(
        raw: RawEnvironment,
    ) -> Sensors<FakeEnvironment, FakeLight, FakeMicrophone> {
        Sensors::new(
            FakeEnvironment::new(raw),
            FakeLight(Some(daylight())),
            FakeMicrophone(1200),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    struct CountingDelay(u32);

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0 += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.0 += ms;
        }
    }

    #[test]
    fn snapshot_is_corrected_and_classified() {
        let mut sensors = station_sensors(room());
        let snapshot = sensors.sample_cycle(&StationConfig::default()).unwrap();
        assert_eq!(snapshot.temperature, 19.0);
        assert_eq!(snapshot.dew_point, 13.0);
        assert_eq!(snapshot.humidity, 70.0);
        assert_eq!(snapshot.humidity_category, HumidityCategory::Bad);
        assert_eq!(snapshot.pressure, 1013.0);
        assert_eq!(snapshot.pressure_category, PressureCategory::Fair);
        assert_eq!(snapshot.lux, 320.5);
        assert_eq!(snapshot.microphone, 1200);
        assert_eq!(snapshot.raw, room());
    }

    #[test]
    fn pressure_category_uses_adjusted_hpa() {
        let mut sensors = station_sensors(RawEnvironment {
            pressure: 96_000.0,
            ..room()
        });
        let config = StationConfig {
            altitude: 500.0,
            ..StationConfig::default()
        };
        let snapshot = sensors.sample_cycle(&config).unwrap();
        // 960 hPa at the station, about 1017 at sea level
        assert!(snapshot.pressure > 1010.0);
        assert_eq!(snapshot.pressure_category, PressureCategory::Fair);
    }

    #[test]
    fn unstable_heater_is_a_fault() {
        let mut sensors = station_sensors(RawEnvironment {
            heater_stable: false,
            ..room()
        });
        assert_eq!(
            sensors.sample_cycle(&StationConfig::default()),
            Err(SensorFault::HeaterUnstable)
        );
    }

    #[test]
    fn missing_light_is_a_fault() {
        let mut sensors = station_sensors(room());
        sensors.light = FakeLight(None);
        assert_eq!(
            sensors.sample_cycle(&StationConfig::default()),
            Err(SensorFault::LightMissing)
        );
    }

    #[test]
    fn bus_error_is_a_fault() {
        let mut sensors = station_sensors(room());
        sensors.environment.reading = Err(());
        assert_eq!(
            sensors.sample_cycle(&StationConfig::default()),
            Err(SensorFault::Environment)
        );
    }

    #[test]
    fn warm_up_discards_two_readings() {
        let mut sensors = station_sensors(room());
        let mut delay = CountingDelay(0);
        sensors.warm_up(&mut delay);
        assert_eq!(sensors.environment.reads, 2);
        assert_eq!(delay.0, 1000);
    }
}
