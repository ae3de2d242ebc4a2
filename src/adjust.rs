use crate::crop_params::Co2Family;
use crate::weather::Co2Factors;

/// Multiplies Kcb by the day's CO2 factor for the crop's response family.
///
/// # Parameters
///
/// - `kc_original`: unadjusted Kcb.
/// - `family`: the CO2 response family; `Co2Family::None` leaves Kcb unchanged.
/// - `co2`: the day's factors, if the weather carries them.
///
/// # Returns
///
/// The CO2-adjusted Kcb.
pub fn co2_adjust(kc_original: f64, family: Co2Family, co2: Option<&Co2Factors>) -> f64 {
    match co2 {
        Some(factors) => kc_original * factors.factor(family),
        None => kc_original,
    }
}

/// Adjusts Kcb for climates that depart from the sub-humid, 2 m/s wind reference of the grass-based curves.
///
/// # Parameters
///
/// - `kc_original`: unadjusted Kcb.
/// - `wind_speed`: wind speed at 2 m [m/s], limited to 1..6.
/// - `rh_min`: minimum relative humidity [%], limited to 20..80.
/// - `crop_height`: crop height [m].
///
/// # Returns
///
/// `Kcb + (0.04 (u2 - 2) - 0.004 (RHmin - 45)) (h / 3)^0.3`.
pub fn adjust_kc(kc_original: f64, wind_speed: f64, rh_min: f64, crop_height: f64) -> f64 {
    let wind_speed = wind_speed.clamp(1.0, 6.0);
    let rh_min = rh_min.clamp(20.0, 80.0);
    let term1 = 0.04 * (wind_speed - 2.0);
    let term2 = 0.004 * (rh_min - 45.0);
    let adjustment = (term1 - term2) * (crop_height.max(0.0) / 3.0).powf(0.3);
    kc_original + adjustment
}
