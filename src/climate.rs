//! Vapor pressure, psychrometric and radiation-geometry helpers (FAO-56 / ASCE 2005).

use crate::units::{c_to_k, deg_to_rad};
use std::f64::consts::PI;

/// Solar constant [MJ m-2 min-1].
pub const SOLAR_CONSTANT: f64 = 0.0820;

/// Stefan-Boltzmann constant [MJ K-4 m-2 d-1].
pub const STEFAN_BOLTZMANN: f64 = 4.903e-9;

/// Saturation vapor pressure [kPa] at air temperature `temp` [C] (Tetens).
pub fn sat_vapor_pressure(temp: f64) -> f64 {
    0.6108 * (17.27 * temp / (temp + 237.3)).exp()
}

/// Slope of the saturation vapor pressure curve [kPa C-1].
pub fn es_slope(temp: f64) -> f64 {
    4098.0 * sat_vapor_pressure(temp) / (temp + 237.3).powi(2)
}

/// Mean daily saturation vapor pressure from Tmax and Tmin [kPa].
pub fn mean_sat_vapor_pressure(tmax: f64, tmin: f64) -> f64 {
    0.5 * (sat_vapor_pressure(tmax) + sat_vapor_pressure(tmin))
}

/// Atmospheric pressure [kPa] at elevation [m].
pub fn air_pressure(elevation: f64) -> f64 {
    101.3 * ((293.0 - 0.0065 * elevation) / 293.0).powf(5.26)
}

/// Psychrometric constant [kPa C-1] for the ASCE standardized equation.
pub fn psychrometric_constant(pressure: f64) -> f64 {
    0.000665 * pressure
}

/// Latent heat of vaporization [MJ kg-1].
pub fn latent_heat(temp: f64) -> f64 {
    2.501 - 0.002361 * temp
}

/// Actual vapor pressure [kPa] from specific humidity [kg/kg] and pressure [kPa].
pub fn ea_from_specific_humidity(q: f64, pressure: f64) -> f64 {
    q * pressure / (0.622 + 0.378 * q)
}

/// Dew point temperature [C] from actual vapor pressure [kPa] (inverse Tetens).
pub fn tdew_from_ea(ea: f64) -> f64 {
    let ln_ea = ea.ln();
    (116.91 + 237.3 * ln_ea) / (16.78 - ln_ea)
}

/// Minimum relative humidity [%] reached at Tmax given the day's dew point.
pub fn rh_min(tdew: f64, tmax: f64) -> f64 {
    (100.0 * sat_vapor_pressure(tdew) / sat_vapor_pressure(tmax)).clamp(0.0, 100.0)
}

/// Solar declination [rad].
pub fn solar_declination(doy: u32) -> f64 {
    0.409 * (2.0 * PI * doy as f64 / 365.0 - 1.39).sin()
}

/// Inverse relative Earth-Sun distance.
pub fn inverse_rel_distance(doy: u32) -> f64 {
    1.0 + 0.033 * (2.0 * PI * doy as f64 / 365.0).cos()
}

/// Sunset hour angle [rad]; clamped for polar day and night.
pub fn sunset_hour_angle(lat_rad: f64, declination: f64) -> f64 {
    (-lat_rad.tan() * declination.tan()).clamp(-1.0, 1.0).acos()
}

/// Daily extraterrestrial radiation [MJ m-2 d-1].
///
/// # Parameters
///
/// - `latitude`: site latitude in decimal degrees, negative in the southern hemisphere.
/// - `doy`: day of year (1-366).
pub fn extraterrestrial_radiation(latitude: f64, doy: u32) -> f64 {
    let lat = deg_to_rad(latitude);
    let decl = solar_declination(doy);
    let omega = sunset_hour_angle(lat, decl);
    let ra = 24.0 * 60.0 / PI
        * SOLAR_CONSTANT
        * inverse_rel_distance(doy)
        * (omega * lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.sin());
    ra.max(0.0)
}

/// Maximum possible daylight hours.
pub fn daylight_hours(latitude: f64, doy: u32) -> f64 {
    24.0 / PI * sunset_hour_angle(deg_to_rad(latitude), solar_declination(doy))
}

/// Clear-sky solar radiation [MJ m-2 d-1] from Ra and elevation.
pub fn clear_sky_radiation(ra: f64, elevation: f64) -> f64 {
    (0.75 + 2e-5 * elevation) * ra
}

/// Net long-wave radiation [MJ m-2 d-1] (FAO-56 eq. 39).
pub fn net_longwave_radiation(tmax: f64, tmin: f64, ea: f64, rs: f64, rso: f64) -> f64 {
    let fcd = if rso > 0.0 {
        1.35 * (rs / rso).clamp(0.3, 1.0) - 0.35
    } else {
        0.05
    };
    STEFAN_BOLTZMANN
        * 0.5
        * (c_to_k(tmax).powi(4) + c_to_k(tmin).powi(4))
        * (0.34 - 0.14 * ea.max(0.0).sqrt())
        * fcd
}

/// Net radiation [MJ m-2 d-1] for a surface with the given albedo.
pub fn net_radiation(rs: f64, rso: f64, tmax: f64, tmin: f64, ea: f64, albedo: f64) -> f64 {
    (1.0 - albedo) * rs - net_longwave_radiation(tmax, tmin, ea, rs, rso)
}
