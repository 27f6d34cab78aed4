use crate::conversion::SettlingTime;

/// Oversampling Ratio
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OversamplingRatio {
    OSR256,
    OSR512,
    OSR1024,
    OSR2048,
    #[default]
    OSR4096,
}

impl OversamplingRatio {
    /// Offset added to the conversion command.
    pub fn value(&self) -> u8 {
        match *self {
            OversamplingRatio::OSR256 => 0x00,
            OversamplingRatio::OSR512 => 0x02,
            OversamplingRatio::OSR1024 => 0x04,
            OversamplingRatio::OSR2048 => 0x06,
            OversamplingRatio::OSR4096 => 0x08,
        }
    }

    /// Maximum ADC conversion time for this ratio.
    pub fn settling_time(&self) -> SettlingTime {
        // 0.60 / 1.17 / 2.28 / 4.54 / 9.04 ms max
        let us = match *self {
            OversamplingRatio::OSR256 => 600,
            OversamplingRatio::OSR512 => 1_170,
            OversamplingRatio::OSR1024 => 2_280,
            OversamplingRatio::OSR2048 => 4_540,
            OversamplingRatio::OSR4096 => 9_040,
        };
        SettlingTime::from_micros(us)
    }
}

/// Number of 16-bit words in the PROM.
pub const PROM_WORDS: usize = 8;

/// Factory calibration data read from PROM.
///
/// All eight words are kept as read. Word 7 carries the CRC-4 in its low
/// nibble; nothing in this type ever clears it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    words: [u16; PROM_WORDS],
}

impl Calibration {
    pub const fn new(words: [u16; PROM_WORDS]) -> Calibration {
        Calibration { words }
    }

    /// Raw PROM words, index 0..7.
    pub fn words(&self) -> &[u16; PROM_WORDS] {
        &self.words
    }

    /// C1: Pressure sensitivity | SENST1
    pub fn sens_t1(&self) -> u16 {
        self.words[1]
    }

    /// C2: Pressure offset | OFFT1
    pub fn off_t1(&self) -> u16 {
        self.words[2]
    }

    /// C3: Temperature coefficient of pressure sensitivity | TCS
    pub fn tcs(&self) -> u16 {
        self.words[3]
    }

    /// C4: Temperature coefficient of pressure offset | TCO
    pub fn tco(&self) -> u16 {
        self.words[4]
    }

    /// C5: Reference temperature | TREF
    pub fn t_ref(&self) -> u16 {
        self.words[5]
    }

    /// C6: Temperature coefficient of the temperature | TEMPSENS
    pub fn temp_sens(&self) -> u16 {
        self.words[6]
    }

    /// CRC nibble as programmed at the factory.
    pub fn stored_crc(&self) -> u8 {
        (self.words[7] & 0x000F) as u8
    }

    /// CRC nibble computed over the PROM contents.
    pub fn computed_crc(&self) -> u8 {
        crc4(&self.words)
    }

    pub fn crc_ok(&self) -> bool {
        self.stored_crc() == self.computed_crc()
    }
}

/// Outcome of a PROM load: the words plus whether their CRC matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationReport {
    pub calibration: Calibration,
    pub crc_ok: bool,
}

impl From<Calibration> for CalibrationReport {
    fn from(calibration: Calibration) -> Self {
        CalibrationReport {
            crc_ok: calibration.crc_ok(),
            calibration,
        }
    }
}

/// 4-bit CRC over the 16 PROM bytes, high byte of each word first.
///
/// The low nibble of word 7 holds the stored CRC and is treated as zero.
pub fn crc4(prom: &[u16; PROM_WORDS]) -> u8 {
    let mut rem: u16 = 0;

    for cnt in 0..PROM_WORDS * 2 {
        let mut word = prom[cnt >> 1];
        if cnt >> 1 == PROM_WORDS - 1 {
            word &= 0xFFF0;
        }

        let byte = if cnt % 2 == 1 { word & 0x00FF } else { word >> 8 };
        rem ^= byte;

        for _ in 0..8 {
            // u16 shift drops bit 15
            rem = if rem & 0x8000 != 0 {
                (rem << 1) ^ 0x3000
            } else {
                rem << 1
            };
        }
    }

    ((rem >> 12) & 0x000F) as u8
}
