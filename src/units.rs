//! Unit conversions used by the weather filler and the reference-ET methods.

use std::f64::consts::PI;

/// Fahrenheit to Celsius.
pub fn f_to_c(temp_f: f64) -> f64 {
    (temp_f - 32.0) / 1.8
}

/// Celsius to Fahrenheit.
pub fn c_to_f(temp_c: f64) -> f64 {
    temp_c * 1.8 + 32.0
}

/// Celsius to Kelvin.
pub fn c_to_k(temp_c: f64) -> f64 {
    temp_c + 273.15
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Inches to millimeters.
pub fn in_to_mm(inches: f64) -> f64 {
    inches * 25.4
}

/// Miles per hour to meters per second.
pub fn mph_to_mps(mph: f64) -> f64 {
    mph * 0.44704
}

/// Langleys per day to MJ m-2 d-1.
pub fn langley_to_mj(ly: f64) -> f64 {
    ly * 0.041868
}

/// Mean W m-2 over a day to MJ m-2 d-1.
pub fn w_m2_to_mj(w_m2: f64) -> f64 {
    w_m2 * 0.0864
}

/// Wind speed measured at `height` meters rescaled to 2 m using the FAO-56
/// logarithmic profile (eq. 47).
///
/// # Parameters
///
/// - `wind`: wind speed at the anemometer height [m/s].
/// - `height`: anemometer height above ground [m]. Heights at or below 2 m are returned unchanged.
pub fn wind_to_2m(wind: f64, height: f64) -> f64 {
    if (height - 2.0).abs() < 1e-6 || height <= 2.0 {
        return wind;
    }
    wind * 4.87 / (67.8 * height - 5.42).ln()
}
