//! Driver for the MEAS MS5803-14BA pressure sensor over I2C, built on the
//! [`embedded-hal`] 1.0 traits.
//!
//! The sensor stores six calibration coefficients and a CRC-4 in its PROM.
//! Pressure (D1) and temperature (D2) are sampled by a 24-bit ADC; each
//! conversion is started with a command, needs a fixed settling time that
//! depends on the oversampling ratio, and is then read back. The raw words
//! go through the datasheet's second order compensation to give
//! temperature, pressure and water depth.
//!
//! ```ignore
//! let mut sensor = Ms5803::new(i2c, Config::default());
//! sensor.initialize(&mut delay)?;
//! let reading = sensor.measure(&mut delay)?;
//! ```
//!
//! Hosts that must not block can drive the cycle by hand:
//! [`Ms5803::start_conversion`] returns the [`SettlingTime`] to wait before
//! calling [`Ms5803::read_conversion_result`].
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
#![cfg_attr(not(test), no_std)]
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

mod calibration;
mod command;
mod compensation;
mod conversion;
mod error;

pub use calibration::{crc4, Calibration, CalibrationReport, OversamplingRatio, PROM_WORDS};
pub use compensation::{compensate, CompensatedReading, WaterType, SEA_LEVEL_MBAR};
pub use conversion::{Channel, CycleState, RawSample, SettlingTime};
pub use error::DeviceError;

use command::Command;

macro_rules! defmt {
    ($body:expr) => {
        #[cfg(feature = "defmt")]
        {
            use defmt::*;

            $body;
        }
    };
}

/// Time the device needs to reload its PROM after a reset.
pub const RESET_SETTLING: SettlingTime = SettlingTime::from_micros(10_000);

/// I2C address, selected by the CSB pin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Address {
    /// CSB high.
    #[default]
    Primary,
    /// CSB low.
    Secondary,
}

impl From<Address> for u8 {
    fn from(address: Address) -> Self {
        match address {
            Address::Primary => 0x76,
            Address::Secondary => 0x77,
        }
    }
}

/// Driver settings fixed at construction, apart from the water type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub address: Address,
    pub oversampling_ratio: OversamplingRatio,
    pub water_type: WaterType,
    /// Turn a PROM CRC mismatch into [`DeviceError::InvalidCRC`] instead of
    /// only clearing [`Ms5803::calibration_verified`].
    pub require_valid_crc: bool,
}

impl Config {
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    pub fn with_oversampling_ratio(mut self, ratio: OversamplingRatio) -> Self {
        self.oversampling_ratio = ratio;
        self
    }

    pub fn with_water_type(mut self, water_type: WaterType) -> Self {
        self.water_type = water_type;
        self
    }

    pub fn with_require_valid_crc(mut self, require: bool) -> Self {
        self.require_valid_crc = require;
        self
    }
}

pub struct Ms5803<I2C> {
    i2c: I2C,
    config: Config,
    calibration: Option<Calibration>,
    crc_ok: bool,
    sample: RawSample,
    state: CycleState,
}

impl<I2C> Ms5803<I2C>
where
    I2C: I2c,
{
    /// Create a new instance. Nothing is sent until [`Ms5803::initialize`]
    /// or [`Ms5803::reset`] is called.
    pub fn new(i2c: I2C, config: Config) -> Self {
        Self {
            i2c,
            config,
            calibration: None,
            crc_ok: false,
            sample: RawSample::default(),
            state: CycleState::Idle,
        }
    }

    /// Reset the device, wait for it to come back, then load the PROM.
    ///
    /// A failed reset leaves the driver uncalibrated; run this again to
    /// retry.
    pub fn initialize<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<CalibrationReport, DeviceError<I2C::Error>> {
        self.calibration = None;
        self.crc_ok = false;

        let settle = self.reset()?;
        delay.delay_us(settle.as_micros());
        self.load_calibration()
    }

    /// Send the reset command. No other command is valid until the returned
    /// time has elapsed. Any pending conversion is dropped, even if the
    /// command fails.
    pub fn reset(&mut self) -> Result<SettlingTime, DeviceError<I2C::Error>> {
        defmt!(trace!("Resetting sensor"));
        self.state = CycleState::Idle;
        self.write(Command::Reset)?;
        Ok(RESET_SETTLING)
    }

    /// Every module is individually factory calibrated at two temperatures
    /// and two pressures. The resulting coefficients are stored in the
    /// 128-bit PROM together with a CRC-4.
    ///
    /// A bus error aborts the load and leaves the driver uncalibrated. A CRC
    /// mismatch still stores the words but marks them unverified.
    pub fn load_calibration(&mut self) -> Result<CalibrationReport, DeviceError<I2C::Error>> {
        self.calibration = None;
        self.crc_ok = false;

        let mut words = [0u16; PROM_WORDS];
        for (index, word) in words.iter_mut().enumerate() {
            let mut buf = [0u8; 2];
            self.read(Command::ReadPROM(index as u8), &mut buf)?;
            *word = u16::from_be_bytes(buf);
        }
        defmt!(debug!("Calibration words {}", words));

        let report = CalibrationReport::from(Calibration::new(words));
        self.calibration = Some(report.calibration);
        self.crc_ok = report.crc_ok;

        if !report.crc_ok {
            defmt!(warn!(
                "Calibration CRC mismatch: stored {=u8:#x}, computed {=u8:#x}",
                report.calibration.stored_crc(),
                report.calibration.computed_crc()
            ));
            if self.config.require_valid_crc {
                return Err(DeviceError::InvalidCRC);
            }
        }

        Ok(report)
    }

    /// Start an ADC conversion on `channel` at the configured ratio.
    ///
    /// The result must not be read before the returned time has passed; the
    /// device gives no error for an early read, only garbage.
    pub fn start_conversion(
        &mut self,
        channel: Channel,
    ) -> Result<SettlingTime, DeviceError<I2C::Error>> {
        let ratio = self.config.oversampling_ratio;
        if let Err(e) = self.write(Command::Conversion(channel, ratio)) {
            self.state = self.state.abandon();
            return Err(e);
        }

        self.state = self.state.start(channel);
        let settle = ratio.settling_time();
        defmt!(trace!("Started {} conversion, settling {}", channel, settle));
        Ok(settle)
    }

    /// Read the 24-bit result of the conversion started for `channel`.
    ///
    /// Fails without touching the bus if no conversion for `channel` is
    /// pending.
    pub fn read_conversion_result(
        &mut self,
        channel: Channel,
    ) -> Result<u32, DeviceError<I2C::Error>> {
        if let Err(e) = self.state.check_read(channel) {
            return Err(DeviceError::sequence(e));
        }

        let mut buf = [0u8; 3];
        if let Err(e) = self.read(Command::ReadADC, &mut buf) {
            self.state = self.state.abandon();
            return Err(e);
        }

        let value = u32::from_be_bytes([0, buf[0], buf[1], buf[2]]);
        self.sample.set(channel, value);
        self.state = self.state.finish(channel);
        defmt!(trace!("{} ADC result {=u32}", channel, value));
        Ok(value)
    }

    /// Start a conversion, block for its settling time, and read it.
    pub fn convert<D: DelayNs>(
        &mut self,
        channel: Channel,
        delay: &mut D,
    ) -> Result<u32, DeviceError<I2C::Error>> {
        let settle = self.start_conversion(channel)?;
        delay.delay_us(settle.as_micros());
        self.read_conversion_result(channel)
    }

    /// Run a whole cycle: D1, D2, then compensation.
    pub fn measure<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<CompensatedReading, DeviceError<I2C::Error>> {
        self.convert(Channel::Pressure, delay)?;
        self.convert(Channel::Temperature, delay)?;
        self.compensated_reading()
    }

    /// Compensate the most recent D1 and D2 words.
    ///
    /// Values from earlier cycles are used as they are if a channel has not
    /// been read again since.
    pub fn compensated_reading(
        &mut self,
    ) -> Result<CompensatedReading, DeviceError<I2C::Error>> {
        let Some(calibration) = self.calibration else {
            return Err(DeviceError::Uncalibrated);
        };
        let Some(d1) = self.sample.get(Channel::Pressure) else {
            return Err(DeviceError::NoSample(Channel::Pressure));
        };
        let Some(d2) = self.sample.get(Channel::Temperature) else {
            return Err(DeviceError::NoSample(Channel::Temperature));
        };

        let reading = compensate(d1, d2, &calibration, self.config.water_type);
        if self.state == CycleState::BothChannelsReady {
            self.state = CycleState::Compensated;
        }

        defmt!(debug!(
            "Temperature {} C, pressure {} mbar, depth {} m",
            reading.temperature_c(),
            reading.pressure_mbar(),
            reading.depth_m
        ));
        Ok(reading)
    }

    pub fn set_water_type(&mut self, water_type: WaterType) {
        self.config.water_type = water_type;
    }

    pub fn water_type(&self) -> WaterType {
        self.config.water_type
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loaded PROM contents, if any.
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// `true` once a calibration has been loaded and its CRC matched.
    pub fn calibration_verified(&self) -> bool {
        self.calibration.is_some() && self.crc_ok
    }

    pub fn raw_sample(&self) -> RawSample {
        self.sample
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write(&mut self, command: Command) -> Result<(), DeviceError<I2C::Error>> {
        self.i2c
            .write(self.config.address.into(), &[command.value()])?;
        Ok(())
    }

    fn read(&mut self, command: Command, buf: &mut [u8]) -> Result<(), DeviceError<I2C::Error>> {
        self.i2c
            .write_read(self.config.address.into(), &[command.value()], buf)?;
        Ok(())
    }
}
