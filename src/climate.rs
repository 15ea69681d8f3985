//! Calibration and weather-station style descriptions.

/// Standard gravity, m/s²
const GRAVITY: f32 = 9.80665;
/// Specific gas constant of dry air, J/(kg·K), rounded
const DRY_AIR: f32 = 287.0;

/// Barometer-dial description of sea-level pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PressureCategory {
    Storm,
    Rain,
    Change,
    Fair,
    Dry,
}

impl PressureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PressureCategory::Storm => "storm",
            PressureCategory::Rain => "rain",
            PressureCategory::Change => "change",
            PressureCategory::Fair => "fair",
            PressureCategory::Dry => "dry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HumidityCategory {
    Good,
    Bad,
}

impl HumidityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HumidityCategory::Good => "good",
            HumidityCategory::Bad => "bad",
        }
    }
}

/// Classifies pressure in hPa. Lower bounds are inclusive.
pub fn describe_pressure(hpa: f32) -> PressureCategory {
    if hpa < 970.0 {
        PressureCategory::Storm
    } else if hpa < 990.0 {
        PressureCategory::Rain
    } else if hpa < 1010.0 {
        PressureCategory::Change
    } else if hpa < 1030.0 {
        PressureCategory::Fair
    } else {
        PressureCategory::Dry
    }
}

/// Good strictly between 40% and 60% relative humidity.
pub fn describe_humidity(relative_humidity: f32) -> HumidityCategory {
    if relative_humidity > 40.0 && relative_humidity < 60.0 {
        HumidityCategory::Good
    } else {
        HumidityCategory::Bad
    }
}

/// Sea-level equivalent of station pressure `hpa` measured at `altitude`
/// meters and `temperature` °C.
pub fn adjust_to_sea_pressure(hpa: f32, temperature: f32, altitude: f32) -> f32 {
    hpa + (hpa * GRAVITY * altitude) / (DRY_AIR * (273.0 + temperature + altitude / 400.0))
}

/// Temperature and humidity after removing board self-heating.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Corrected {
    pub temperature: f32,
    pub dew_point: f32,
    pub humidity: f32,
}

/// Subtracts `offset` from the measured temperature and recomputes relative
/// humidity against the dew point estimated from the raw reading.
pub fn correct(temperature: f32, humidity: f32, offset: f32) -> Corrected {
    let corrected = temperature - offset;
    let dew_point = temperature - (100.0 - humidity) / 5.0;
    Corrected {
        temperature: corrected,
        dew_point,
        humidity: 100.0 - 5.0 * (corrected - dew_point),
    }
}
