//! Second order temperature compensation, MS5803-14BA datasheet variant.
//!
//! Everything here is integer arithmetic on `i64`. Divisions are written as
//! `/` and truncate toward zero; replacing them with shifts changes results
//! for negative `dT`.

use crate::calibration::Calibration;

/// Standard atmosphere at sea level, mbar.
pub const SEA_LEVEL_MBAR: f32 = 1013.25;

/// Water density assumed when turning pressure into depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaterType {
    #[default]
    Fresh,
    Salt,
}

impl WaterType {
    /// Metres of water per bar above atmospheric.
    pub fn depth_factor(&self) -> f32 {
        match self {
            WaterType::Fresh => 1.019716,
            WaterType::Salt => 0.9945,
        }
    }

    /// Depth in metres below the surface for an absolute pressure in mbar.
    pub fn depth_m(&self, pressure_mbar: f32) -> f32 {
        (pressure_mbar - SEA_LEVEL_MBAR) * self.depth_factor() / 100.0
    }
}

/// A fully compensated measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompensatedReading {
    /// Temperature in 0.01 degC.
    pub temperature: i32,
    /// Pressure in 0.1 mbar.
    pub pressure: i32,
    /// Depth in metres for the water type used.
    pub depth_m: f32,
}

impl CompensatedReading {
    pub fn temperature_c(&self) -> f32 {
        self.temperature as f32 / 100.0
    }

    pub fn pressure_mbar(&self) -> f32 {
        self.pressure as f32 / 10.0
    }
}

/// First order terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FirstOrder {
    pub d_t: i64,
    pub temp: i64,
    pub off: i64,
    pub sens: i64,
}

pub(crate) fn first_order(d2: u32, calibration: &Calibration) -> FirstOrder {
    // Difference between actual and reference temperature
    let d_t = d2 as i64 - calibration.t_ref() as i64 * (1_i64 << 8);
    // Actual temperature, 0.01 degC
    let temp = 2000 + d_t * calibration.temp_sens() as i64 / (1_i64 << 23);
    // Offset at actual temperature
    let off =
        calibration.off_t1() as i64 * (1_i64 << 16) + calibration.tco() as i64 * d_t / (1_i64 << 7);
    // Sensitivity at actual temperature
    let sens =
        calibration.sens_t1() as i64 * (1_i64 << 15) + calibration.tcs() as i64 * d_t / (1_i64 << 8);

    FirstOrder {
        d_t,
        temp,
        off,
        sens,
    }
}

/// Second Order Temperature Compensation
///
/// Returns `(Ti, OFFi, SENSi)`.
pub(crate) fn temp_compensate(temp: i64, d_t: i64) -> (i64, i64, i64) {
    let below_ref = (temp - 2000) * (temp - 2000);

    if temp < 2000 {
        let ti = 3 * d_t * d_t / (1_i64 << 33);
        let mut offi = 3 * below_ref / 2;
        let mut sensi = 5 * below_ref / 8;

        if temp < -1500 {
            let very_cold = (temp + 1500) * (temp + 1500);
            offi += 7 * very_cold;
            sensi += 4 * very_cold;
        }
        (ti, offi, sensi)
    } else {
        (7 * d_t * d_t / (1_i64 << 37), below_ref / 16, 0)
    }
}

/// Turns raw D1/D2 words into temperature, pressure and depth.
pub fn compensate(
    d1: u32,
    d2: u32,
    calibration: &Calibration,
    water_type: WaterType,
) -> CompensatedReading {
    let FirstOrder {
        d_t,
        temp,
        off,
        sens,
    } = first_order(d2, calibration);
    let (ti, offi, sensi) = temp_compensate(temp, d_t);

    let off2 = off - offi;
    let sens2 = sens - sensi;
    let temp2 = temp - ti;
    let p = (d1 as i64 * sens2 / (1_i64 << 21) - off2) / (1_i64 << 15);

    let temperature = temp2 as i32;
    let pressure = p as i32;
    let pressure_mbar = pressure as f32 / 10.0;

    CompensatedReading {
        temperature,
        pressure,
        depth_m: water_type.depth_m(pressure_mbar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    // C1..C6 from the datasheet worked example.
    const DATASHEET: Calibration =
        Calibration::new([0x0000, 46372, 43981, 29059, 27842, 31553, 28165, 0x1238]);
    const D1: u32 = 4_311_550;
    const D2: u32 = 8_387_300;

    fn d2_for_delta(d_t: i64) -> u32 {
        (DATASHEET.t_ref() as i64 * 256 + d_t) as u32
    }

    #[test]
    fn datasheet_first_order_terms() {
        let terms = first_order(D2, &DATASHEET);
        assert_eq!(
            terms,
            FirstOrder {
                d_t: 309_732,
                temp: 3039,
                off: 2_949_710_365,
                sens: 1_554_675_907,
            }
        );
    }

    #[test]
    fn datasheet_reading() {
        let reading = compensate(D1, D2, &DATASHEET, WaterType::Fresh);
        // TEMP2 = 3039 - 4, OFFi = 1039^2 / 16
        assert_eq!(reading.temperature, 3035);
        assert_eq!(reading.pressure, 7526);
        assert!((reading.temperature_c() - 30.35).abs() < 0.005);
        assert!((reading.pressure_mbar() - 752.6).abs() < 0.05);
    }

    #[test]
    fn deterministic() {
        let a = compensate(D1, D2, &DATASHEET, WaterType::Salt);
        let b = compensate(D1, D2, &DATASHEET, WaterType::Salt);
        assert_eq!(a, b);
    }

    #[test]
    fn exactly_twenty_degrees_uses_high_branch() {
        let terms = first_order(d2_for_delta(0), &DATASHEET);
        assert_eq!(terms.temp, 2000);
        assert_eq!(temp_compensate(terms.temp, terms.d_t), (0, 0, 0));
    }

    #[test]
    fn just_below_twenty_degrees_uses_low_branch() {
        let terms = first_order(d2_for_delta(-298), &DATASHEET);
        assert_eq!(terms.temp, 1999);
        // high branch would give OFFi = 1 / 16 = 0
        assert_eq!(temp_compensate(terms.temp, terms.d_t), (0, 1, 0));
    }

    #[test_case(-1_042_500, -1500, (379, 18_375_000, 7_656_250) ; "at minus fifteen")]
    #[test_case(-1_100_000, -1693, (422, 20_718_116, 8_672_901) ; "below minus fifteen")]
    fn very_cold_correction(d_t: i64, temp: i64, expected: (i64, i64, i64)) {
        let terms = first_order(d2_for_delta(d_t), &DATASHEET);
        assert_eq!(terms.temp, temp);
        assert_eq!(temp_compensate(terms.temp, terms.d_t), expected);
    }

    #[test]
    fn very_cold_reading() {
        let reading = compensate(D1, d2_for_delta(-1_100_000), &DATASHEET, WaterType::Fresh);
        assert_eq!(reading.temperature, -2115);
        assert_eq!(reading.pressure, 6930);
    }

    #[test]
    fn truncates_toward_zero() {
        // -298 * 28165 / 2^23 is -1.0005; a shift would give -2
        let terms = first_order(d2_for_delta(-298), &DATASHEET);
        assert_eq!(terms.temp, 1999);
    }

    #[test]
    fn salt_and_fresh_depth_ratio() {
        let fresh = WaterType::Fresh.depth_m(2013.25);
        let salt = WaterType::Salt.depth_m(2013.25);
        assert!((fresh - 10.19716).abs() < 1e-4);
        assert!((salt - 9.945).abs() < 1e-4);
        assert!((fresh / salt - 1.019716 / 0.9945).abs() < 1e-5);
    }

    #[test]
    fn depth_follows_water_type() {
        let fresh = compensate(D1, D2, &DATASHEET, WaterType::Fresh);
        let salt = compensate(D1, D2, &DATASHEET, WaterType::Salt);
        assert_eq!(fresh.pressure, salt.pressure);
        assert!((fresh.depth_m / salt.depth_m - 1.019716 / 0.9945).abs() < 1e-5);
        assert!(fresh.depth_m < 0.0);
    }
}
