//! LTR-559 ambient light and proximity sensor.

use core::fmt;

use embedded_hal::i2c::I2c;

use crate::sensors::{LightReading, LightSensor};

pub const ADDRESS: u8 = 0x23;

// Registers
const ALS_CONTROL: u8 = 0x80;
const PS_CONTROL: u8 = 0x81;
const PS_LED: u8 = 0x82;
const PS_N_PULSES: u8 = 0x83;
const PS_MEAS_RATE: u8 = 0x84;
const ALS_MEAS_RATE: u8 = 0x85;
const PART_ID: u8 = 0x86;
const ALS_DATA_CH1: u8 = 0x88; // CH1 low, CH1 high, CH0 low, CH0 high
const ALS_PS_STATUS: u8 = 0x8C;
const PS_DATA: u8 = 0x8D;

const PART_NUMBER: u8 = 0x09; // upper nibble of PART_ID

const ALS_ACTIVE: u8 = 0x01;
const ALS_GAIN_4X: u8 = 0b010 << 2;
const PS_ACTIVE: u8 = 0x03;
const PS_LED_50MA: u8 = 0x7B; // 60kHz, 100% duty, 50mA
const ALS_50MS_50MS: u8 = 0b001 << 3; // integration 50ms, repeat 50ms
const PS_100MS: u8 = 0x02;

const STATUS_ALS_INVALID: u8 = 0x80;
const STATUS_ALS_NEW: u8 = 0x04;

const GAIN: f32 = 4.0;
const INTEGRATION_MS: f32 = 50.0;

// Lux coefficients per CH1/(CH0+CH1) ratio band, scaled by 10000
const CH0_COEFF: [f32; 4] = [17743.0, 42785.0, 5926.0, 0.0];
const CH1_COEFF: [f32; 4] = [-11059.0, 19548.0, -1185.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ltr559Error<E> {
    I2c(E),
    /// Something answered at the address but it is not an LTR-559
    WrongPart(u8),
}

impl<E: fmt::Debug> fmt::Display for Ltr559Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ltr559Error::I2c(e) => write!(f, "i2c error: {:?}", e),
            Ltr559Error::WrongPart(id) => write!(f, "unexpected part id {:#04x}", id),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Ltr559Error<E> {}

/// Lux from the two ALS channels (CH0 visible+IR, CH1 IR).
pub fn lux(ch0: u16, ch1: u16) -> f32 {
    let (ch0, ch1) = (f32::from(ch0), f32::from(ch1));
    let total = ch0 + ch1;
    let ratio = if total == 0.0 { 1.0 } else { ch1 / total };
    let band = if ratio < 0.45 {
        0
    } else if ratio < 0.64 {
        1
    } else if ratio < 0.85 {
        2
    } else {
        3
    };
    let lux = (ch0 * CH0_COEFF[band] - ch1 * CH1_COEFF[band]) / 10000.0;
    (lux / (INTEGRATION_MS / 100.0) / GAIN).max(0.0)
}

pub struct Ltr559<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Ltr559<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            address: ADDRESS,
        }
    }

    pub fn release(self) -> I {
        self.i2c
    }

    /// Checks the part id and starts continuous ALS and PS measurement.
    pub fn init(&mut self) -> Result<(), Ltr559Error<I::Error>> {
        let part = self.read_register(PART_ID)?;
        if part >> 4 != PART_NUMBER {
            return Err(Ltr559Error::WrongPart(part));
        }
        for (register, value) in [
            (ALS_CONTROL, ALS_ACTIVE | ALS_GAIN_4X),
            (ALS_MEAS_RATE, ALS_50MS_50MS),
            (PS_LED, PS_LED_50MA),
            (PS_N_PULSES, 1),
            (PS_MEAS_RATE, PS_100MS),
            (PS_CONTROL, PS_ACTIVE),
        ] {
            self.write_register(register, value)?;
        }
        info!("LTR-559 revision {=u8} ready", part & 0x0F);
        Ok(())
    }

    /// Latest reading, `None` if the ALS has nothing new or valid.
    pub fn reading(&mut self) -> Result<Option<LightReading>, Ltr559Error<I::Error>> {
        let status = self.read_register(ALS_PS_STATUS)?;
        if status & STATUS_ALS_NEW == 0 || status & STATUS_ALS_INVALID != 0 {
            debug!("No ALS data, status {=u8:#x}", status);
            return Ok(None);
        }

        let mut als = [0u8; 4];
        self.i2c
            .write_read(self.address, &[ALS_DATA_CH1], &mut als)
            .map_err(Ltr559Error::I2c)?;
        let ch1 = u16::from_le_bytes([als[0], als[1]]);
        let ch0 = u16::from_le_bytes([als[2], als[3]]);

        let mut ps = [0u8; 2];
        self.i2c
            .write_read(self.address, &[PS_DATA], &mut ps)
            .map_err(Ltr559Error::I2c)?;
        let proximity = u16::from_le_bytes([ps[0], ps[1] & 0x07]);

        Ok(Some(LightReading {
            lux: lux(ch0, ch1),
            proximity,
        }))
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Ltr559Error<I::Error>> {
        let mut value = [0u8];
        self.i2c
            .write_read(self.address, &[register], &mut value)
            .map_err(Ltr559Error::I2c)?;
        Ok(value[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Ltr559Error<I::Error>> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(Ltr559Error::I2c)
    }
}

impl<I: I2c> LightSensor for Ltr559<I> {
    type Error = Ltr559Error<I::Error>;

    fn read(&mut self) -> Result<Option<LightReading>, Self::Error> {
        self.reading()
    }
}
