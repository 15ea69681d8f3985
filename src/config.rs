//! Deploy-time configuration.
//!
//! Everything here is fixed when the firmware is built. Credentials and topic
//! names can be overridden through environment variables at build time, e.g.
//!
//! ```sh
//! MQTT_USERNAME=me MQTT_PASSWORD=secret MQTT_TOPIC_PREFIX=me/feeds \
//!     cargo build --release --features firmware --target thumbv6m-none-eabi
//! ```

/// Temperature compensation with the backlight off
pub const TEMPERATURE_OFFSET_DARK: f32 = 3.0;
/// Temperature compensation with the backlight on; the screen heats the board
pub const TEMPERATURE_OFFSET_LIT: f32 = 5.0;
/// How often to publish readings, in seconds
pub const UPDATE_INTERVAL: u32 = 60;
/// Station altitude in meters, used for the sea-level pressure adjustment
pub const ALTITUDE: f32 = 0.0;
/// Normalized gas readings below this light the alert indicator
pub const GAS_ALERT: f32 = 0.5;

pub const NETWORK_NAME: &str = or_default(option_env!("WIFI_SSID"), "");
pub const CLIENT_ID: &str = or_default(option_env!("MQTT_CLIENT_ID"), "EnviroPlus");
pub const SERVER_ADDRESS: &str = or_default(option_env!("MQTT_SERVER"), "io.adafruit.com");
pub const MQTT_USERNAME: &str = or_default(option_env!("MQTT_USERNAME"), "");
pub const MQTT_PASSWORD: &str = or_default(option_env!("MQTT_PASSWORD"), "");
pub const MQTT_TOPIC_PREFIX: &str = or_default(option_env!("MQTT_TOPIC_PREFIX"), "enviro/feeds");
pub const MQTT_KEEP_ALIVE: u16 = 30; // seconds

const fn or_default(value: Option<&'static str>, default: &'static str) -> &'static str {
    match value {
        Some(v) => v,
        None => default,
    }
}

/// Tunables for the station loop.
///
/// `temperature_offset` is the only value that changes at runtime (buttons
/// A and B swap it together with the backlight).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StationConfig {
    pub temperature_offset: f32,
    pub update_interval_secs: u32,
    pub altitude: f32,
    pub gas_alert: f32,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            temperature_offset: TEMPERATURE_OFFSET_DARK,
            update_interval_secs: UPDATE_INTERVAL,
            altitude: ALTITUDE,
            gas_alert: GAS_ALERT,
        }
    }
}

impl StationConfig {
    pub fn update_interval_ms(&self) -> u64 {
        u64::from(self.update_interval_secs) * 1000
    }
}

/// Session parameters sent in the MQTT CONNECT packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MqttConfig<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub keep_alive_secs: u16,
    pub topic_prefix: &'a str,
}

impl Default for MqttConfig<'static> {
    fn default() -> Self {
        MqttConfig {
            client_id: CLIENT_ID,
            username: MQTT_USERNAME,
            password: MQTT_PASSWORD,
            keep_alive_secs: MQTT_KEEP_ALIVE,
            topic_prefix: MQTT_TOPIC_PREFIX,
        }
    }
}
