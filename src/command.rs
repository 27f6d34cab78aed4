use crate::calibration::{OversamplingRatio, PROM_WORDS};
use crate::conversion::Channel;

const RESET: u8 = 0x1E;
const PROM_READ_BASE: u8 = 0xA0;
const ADC_READ: u8 = 0x00;
const ADC_CONV_BASE: u8 = 0x40;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Reset,
    /// PROM word 0..7, 16 bits each.
    ReadPROM(u8),
    Conversion(Channel, OversamplingRatio),
    ReadADC, // 24 bit pressure / temperature
}

impl Command {
    pub fn value(&self) -> u8 {
        match self {
            Command::Reset => RESET,
            Command::ReadPROM(index) => {
                debug_assert!((*index as usize) < PROM_WORDS);
                PROM_READ_BASE + (index << 1)
            }
            Command::Conversion(channel, ratio) => ADC_CONV_BASE + ratio.value() + channel.offset(),
            Command::ReadADC => ADC_READ,
        }
    }
}
