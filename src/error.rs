use core::fmt;

use crate::publish::Metric;

/// A required sensor reading is unstable or missing.
///
/// Never fatal: the station flags it on the indicator and keeps looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFault {
    /// The BME68x gas heater has not settled yet
    HeaterUnstable,
    /// The light sensor had no reading ready
    LightMissing,
    /// Bus error talking to the environmental sensor
    Environment,
    /// Bus error talking to the light sensor
    Light,
    /// ADC error reading the microphone
    Microphone,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorFault::HeaterUnstable => f.write_str("gas heater unstable"),
            SensorFault::LightMissing => f.write_str("no light reading"),
            SensorFault::Environment => f.write_str("environment sensor read failed"),
            SensorFault::Light => f.write_str("light sensor read failed"),
            SensorFault::Microphone => f.write_str("microphone read failed"),
        }
    }
}

impl core::error::Error for SensorFault {}

/// Where in the connect/publish/disconnect sequence a publish failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishStage {
    Connect,
    Publish(Metric),
    Disconnect,
}

/// The broker could not be reached or refused a message.
///
/// The last-publish timestamp is left alone so the next interval retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PublishFault {
    pub stage: PublishStage,
}

impl PublishFault {
    pub fn at(stage: PublishStage) -> Self {
        Self { stage }
    }
}

impl fmt::Display for PublishFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            PublishStage::Connect => f.write_str("broker connect failed"),
            PublishStage::Publish(metric) => write!(f, "publish of {} failed", metric.name()),
            PublishStage::Disconnect => f.write_str("broker disconnect failed"),
        }
    }
}

impl core::error::Error for PublishFault {}

/// A topic or payload does not fit its fixed size buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TopicTooLong {
    /// Bytes the topic prefix may take at most
    pub max_prefix: usize,
}

impl fmt::Display for TopicTooLong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "topic prefix longer than {} bytes", self.max_prefix)
    }
}

impl core::error::Error for TopicTooLong {}

/// Loading the badge record failed even after writing the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BadgeError<E> {
    /// The record store itself failed
    Store(E),
    /// The store still reports no record after the default was written
    Missing,
    /// The record is not valid UTF-8
    Encoding,
    /// The record does not fit the read buffer
    Capacity,
}

impl<E: fmt::Debug> fmt::Display for BadgeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadgeError::Store(e) => write!(f, "badge store error: {:?}", e),
            BadgeError::Missing => f.write_str("badge record missing"),
            BadgeError::Encoding => f.write_str("badge record is not UTF-8"),
            BadgeError::Capacity => f.write_str("badge record too large"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for BadgeError<E> {}
