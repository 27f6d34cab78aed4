use core::fmt;

use crate::conversion::{Channel, SequenceError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError<E> {
    /// The bus transaction failed.
    Io(E),
    /// PROM contents do not match their CRC. Only returned when the driver
    /// is configured to require a valid CRC.
    InvalidCRC,
    /// No calibration has been loaded.
    Uncalibrated,
    /// The channel has never been read, so there is nothing to compensate.
    NoSample(Channel),
    /// A result was requested with no conversion pending.
    NotStarted(Channel),
    /// A result was requested for a different channel than the one converting.
    ChannelMismatch { started: Channel, requested: Channel },
}

impl<E> From<E> for DeviceError<E> {
    fn from(error: E) -> Self {
        DeviceError::Io(error)
    }
}

impl<E> DeviceError<E> {
    pub(crate) fn sequence(error: SequenceError) -> Self {
        match error {
            SequenceError::NotStarted(channel) => DeviceError::NotStarted(channel),
            SequenceError::ChannelMismatch { started, requested } => {
                DeviceError::ChannelMismatch { started, requested }
            }
        }
    }
}

impl<E: fmt::Debug> fmt::Display for DeviceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Io(e) => write!(f, "bus error: {:?}", e),
            DeviceError::InvalidCRC => f.write_str("calibration CRC mismatch"),
            DeviceError::Uncalibrated => f.write_str("calibration not loaded"),
            DeviceError::NoSample(channel) => write!(f, "no {:?} sample read yet", channel),
            DeviceError::NotStarted(channel) => {
                write!(f, "{:?} result read without a conversion", channel)
            }
            DeviceError::ChannelMismatch { started, requested } => write!(
                f,
                "{:?} result read while {:?} was converting",
                requested, started
            ),
        }
    }
}
