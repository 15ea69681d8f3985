//! Periodic upload of readings to the message broker.

use core::fmt::{self, Write};

use heapless::String;
use ufmt::uwrite;

use crate::error::{PublishFault, PublishStage, TopicTooLong};
use crate::sensors::SensorSnapshot;
use crate::timer::IntervalTimer;

pub const TOPIC_CAPACITY: usize = 128;
/// Fits any `f32` in its shortest decimal form
pub const PAYLOAD_CAPACITY: usize = 48;

const TOPIC_STEM: &str = "/Enviro";
/// Longest prefix for which every metric topic fits
pub const MAX_TOPIC_PREFIX: usize = TOPIC_CAPACITY - TOPIC_STEM.len() - "Temperature".len();

/// One published scalar, each on its own topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Metric {
    Temperature,
    Humidity,
    Pressure,
    Gas,
    Lux,
    Microphone,
}

impl Metric {
    /// Publish order
    pub const ALL: [Metric; 6] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Pressure,
        Metric::Gas,
        Metric::Lux,
        Metric::Microphone,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Pressure => "Pressure",
            Metric::Gas => "Gas",
            Metric::Lux => "Lux",
            Metric::Microphone => "Mic",
        }
    }

    /// `<prefix>/Enviro<Name>`
    pub fn topic(&self, prefix: &str) -> Result<String<TOPIC_CAPACITY>, TopicTooLong> {
        let mut topic = String::new();
        write!(topic, "{}{}{}", prefix, TOPIC_STEM, self.name()).map_err(|_| TopicTooLong {
            max_prefix: MAX_TOPIC_PREFIX,
        })?;
        Ok(topic)
    }

    /// The metric's value in `snapshot` as a decimal string, floats at full
    /// precision.
    pub fn payload(
        &self,
        snapshot: &SensorSnapshot,
    ) -> Result<String<PAYLOAD_CAPACITY>, fmt::Error> {
        let mut payload = String::new();
        let value = match self {
            Metric::Temperature => snapshot.temperature,
            Metric::Humidity => snapshot.humidity,
            Metric::Pressure => snapshot.pressure,
            Metric::Gas => snapshot.gas_resistance,
            Metric::Lux => snapshot.lux,
            Metric::Microphone => {
                uwrite!(payload, "{}", snapshot.microphone).map_err(|_| fmt::Error)?;
                return Ok(payload);
            }
        };
        write!(payload, "{}", value)?;
        Ok(payload)
    }
}

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
}

/// A message broker session.
pub trait Broker {
    type Error;

    fn connect(&mut self) -> Result<(), Self::Error>;

    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Self::Error>;

    fn disconnect(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishOutcome {
    /// Interval not up yet, the broker was not contacted
    Skipped,
    Published,
}

/// Publishes a snapshot once per interval.
#[derive(Debug, Clone, Copy)]
pub struct Publisher<'a> {
    timer: IntervalTimer,
    topic_prefix: &'a str,
}

impl<'a> Publisher<'a> {
    /// Fails if `topic_prefix` leaves no room for the metric names.
    pub fn new(interval_ms: u64, topic_prefix: &'a str) -> Result<Self, TopicTooLong> {
        if topic_prefix.len() > MAX_TOPIC_PREFIX {
            return Err(TopicTooLong {
                max_prefix: MAX_TOPIC_PREFIX,
            });
        }
        Ok(Self {
            timer: IntervalTimer::new(interval_ms),
            topic_prefix,
        })
    }

    /// When the last successful publish finished, zero before the first one
    pub fn last_publish_ms(&self) -> u64 {
        self.timer.last_ms()
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.timer.is_due(now_ms)
    }

    /// Sends every [`Metric`] of `snapshot` in one broker session if the
    /// interval has elapsed.
    ///
    /// On failure the session is abandoned and the timer is left alone, so
    /// the next due cycle tries again.
    pub fn publish_cycle<B: Broker>(
        &mut self,
        broker: &mut B,
        snapshot: &SensorSnapshot,
        now_ms: u64,
    ) -> Result<PublishOutcome, PublishFault> {
        if !self.timer.is_due(now_ms) {
            debug!("Next publish in {=u64} ms", self.timer.remaining(now_ms));
            return Ok(PublishOutcome::Skipped);
        }

        broker
            .connect()
            .map_err(|_| PublishFault::at(PublishStage::Connect))?;

        for metric in Metric::ALL {
            if self.send(broker, metric, snapshot).is_err() {
                warn!("Publish of {} failed", metric.name());
                // Best effort, the publish error is the one worth reporting
                let _ = broker.disconnect();
                return Err(PublishFault::at(PublishStage::Publish(metric)));
            }
        }

        broker
            .disconnect()
            .map_err(|_| PublishFault::at(PublishStage::Disconnect))?;

        self.timer.mark(now_ms);
        info!("Published {} metrics", Metric::ALL.len());
        Ok(PublishOutcome::Published)
    }

    fn send<B: Broker>(
        &self,
        broker: &mut B,
        metric: Metric,
        snapshot: &SensorSnapshot,
    ) -> Result<(), ()> {
        let topic = metric.topic(self.topic_prefix).map_err(|_| ())?;
        let payload = metric.payload(snapshot).map_err(|_| ())?;
        debug!("Publishing {} = {}", topic.as_str(), payload.as_str());
        broker
            .publish(&topic, payload.as_bytes(), QoS::AtLeastOnce)
            .map_err(|_| ())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::config::StationConfig;
    use crate::sensors::testing::{daylight, room};

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot::derive(room(), daylight(), 1200, &StationConfig::default())
    }

    #[test]
    fn nothing_happens_before_the_interval() {
        let mut publisher = Publisher::new(60_000, "enviro/feeds").unwrap();
        let mut broker = FakeBroker::default();
        let outcome = publisher.publish_cycle(&mut broker, &snapshot(), 59_999);
        assert_eq!(outcome, Ok(PublishOutcome::Skipped));
        assert!(broker.calls.is_empty());
        assert_eq!(publisher.last_publish_ms(), 0);
    }

    #[test]
    fn publishes_all_metrics_in_one_session() {
        let mut publisher = Publisher::new(60_000, "enviro/feeds").unwrap();
        let mut broker = FakeBroker::default();
        let outcome = publisher.publish_cycle(&mut broker, &snapshot(), 60_000);
        assert_eq!(outcome, Ok(PublishOutcome::Published));
        assert_eq!(broker.calls.first(), Some(&Call::Connect));
        assert_eq!(broker.calls.last(), Some(&Call::Disconnect));
        assert_eq!(
            broker.published(),
            [
                ("enviro/feeds/EnviroTemperature", "19"),
                ("enviro/feeds/EnviroHumidity", "70"),
                ("enviro/feeds/EnviroPressure", "1013"),
                ("enviro/feeds/EnviroGas", "50000"),
                ("enviro/feeds/EnviroLux", "320.5"),
                ("enviro/feeds/EnviroMic", "1200"),
            ]
        );
        assert!(broker
            .calls
            .iter()
            .all(|c| !matches!(c, Call::Publish(_, _, qos) if *qos != QoS::AtLeastOnce)));
        assert_eq!(publisher.last_publish_ms(), 60_000);
        assert!(!publisher.is_due(119_999));
    }

    #[test]
    fn refused_connection_keeps_timer_stale() {
        let mut publisher = Publisher::new(60_000, "enviro/feeds").unwrap();
        let mut broker = FakeBroker {
            refuse_connect: true,
            ..FakeBroker::default()
        };
        let outcome = publisher.publish_cycle(&mut broker, &snapshot(), 61_000);
        assert_eq!(outcome, Err(PublishFault::at(PublishStage::Connect)));
        assert_eq!(broker.calls, [Call::Connect]);
        assert_eq!(publisher.last_publish_ms(), 0);
        // Next cycle retries
        assert!(publisher.is_due(62_000));
    }

    #[test]
    fn failed_publish_stops_and_disconnects() {
        let mut publisher = Publisher::new(60_000, "enviro/feeds").unwrap();
        let mut broker = FakeBroker {
            fail_publish: Some(2),
            ..FakeBroker::default()
        };
        let outcome = publisher.publish_cycle(&mut broker, &snapshot(), 60_000);
        assert_eq!(
            outcome,
            Err(PublishFault::at(PublishStage::Publish(Metric::Pressure)))
        );
        assert_eq!(broker.published().len(), 2);
        assert_eq!(broker.attempts, 3);
        assert_eq!(broker.calls.last(), Some(&Call::Disconnect));
        assert_eq!(publisher.last_publish_ms(), 0);
    }

    #[test]
    fn topic_names() {
        assert_eq!(Metric::Microphone.topic("me/feeds").unwrap().as_str(), "me/feeds/EnviroMic");
        assert_eq!(Metric::Lux.topic("x").unwrap().as_str(), "x/EnviroLux");
    }

    #[test]
    fn long_prefix_keeps_topics_distinct() {
        let prefix = "averyveryverylongusername/feeds/livingroom/sensors";
        let mut publisher = Publisher::new(60_000, prefix).unwrap();
        let mut broker = FakeBroker::default();
        publisher.publish_cycle(&mut broker, &snapshot(), 60_000).unwrap();
        let published = broker.published();
        assert_eq!(published.len(), Metric::ALL.len());
        for (metric, (topic, _)) in Metric::ALL.iter().zip(&published) {
            assert!(topic.starts_with(prefix));
            assert!(topic.ends_with(metric.name()), "{} for {:?}", topic, metric);
        }
    }

    #[test]
    fn prefix_without_room_for_names_is_rejected() {
        let prefix = "p".repeat(MAX_TOPIC_PREFIX);
        let temperature = Metric::Temperature.topic(&prefix).unwrap();
        assert_eq!(temperature.len(), TOPIC_CAPACITY);
        assert!(Publisher::new(60_000, &prefix).is_ok());

        let prefix = "p".repeat(MAX_TOPIC_PREFIX + 1);
        let expected = TopicTooLong {
            max_prefix: MAX_TOPIC_PREFIX,
        };
        assert_eq!(Metric::Temperature.topic(&prefix), Err(expected));
        assert_eq!(Publisher::new(60_000, &prefix).err(), Some(expected));
    }

    #[test]
    fn payloads_keep_full_precision() {
        let mut snapshot = snapshot();
        snapshot.pressure = 1013.2547;
        snapshot.gas_resistance = 123_456.79;
        assert_eq!(Metric::Pressure.payload(&snapshot).unwrap().as_str(), "1013.2547");
        assert_eq!(Metric::Gas.payload(&snapshot).unwrap().as_str(), "123456.79");
    }
}
