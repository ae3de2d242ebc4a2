//! Daily weather records and the filling pipeline that turns a raw, gappy
//! station or gridded series into a complete daily frame.

use crate::climate::{air_pressure, ea_from_specific_humidity, rh_min, tdew_from_ea};
use crate::climatology::{Climatology, MonthlyClimatology};
use crate::crop_params::Co2Family;
use crate::error::{CropEtError, Result};
use crate::solar::ThorntonRunning;
use crate::units::wind_to_2m;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Longest run of missing days bridged by linear interpolation.
pub const MAX_INTERP_DAYS: usize = 3;

/// Physical bounds for daily air temperature [C]; values outside are treated as missing.
pub const MIN_AIR_TEMP: f64 = -60.0;
pub const MAX_AIR_TEMP: f64 = 60.0;

/// Window of the running mean air temperature.
pub const T30_DAYS: usize = 30;

/// One day of weather as read from disk. Every measurement may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDailyMet {
    pub date: NaiveDate,
    #[serde(default)]
    pub tmax: Option<f64>, // C
    #[serde(default)]
    pub tmin: Option<f64>, // C
    #[serde(default)]
    pub tdew: Option<f64>, // C
    #[serde(default)]
    pub q: Option<f64>, // specific humidity, kg/kg
    #[serde(default)]
    pub rs: Option<f64>, // MJ m-2 d-1
    #[serde(default)]
    pub wind: Option<f64>, // m/s at the anemometer height
    #[serde(default)]
    pub ppt: Option<f64>, // mm/d
    #[serde(default)]
    pub snow: Option<f64>,
    #[serde(default)]
    pub snow_depth: Option<f64>,
    #[serde(default)]
    pub co2_grass: Option<f64>,
    #[serde(default)]
    pub co2_tree: Option<f64>,
    #[serde(default)]
    pub co2_c4: Option<f64>,
}

impl RawDailyMet {
    /// A record with only a date set.
    pub fn empty(date: NaiveDate) -> Self {
        RawDailyMet {
            date,
            tmax: None,
            tmin: None,
            tdew: None,
            q: None,
            rs: None,
            wind: None,
            ppt: None,
            snow: None,
            snow_depth: None,
            co2_grass: None,
            co2_tree: None,
            co2_c4: None,
        }
    }
}

/// Daily Kcb multipliers for each CO2 response family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Co2Factors {
    pub grass: f64,
    pub tree: f64,
    pub c4: f64,
}

impl Co2Factors {
    pub fn factor(&self, family: Co2Family) -> f64 {
        match family {
            Co2Family::Grass => self.grass,
            Co2Family::Tree => self.tree,
            Co2Family::C4 => self.c4,
            Co2Family::None => 1.0,
        }
    }
}

/// One filled day of meteorology. NaN marks a field that could not be filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyMet {
    pub date: NaiveDate,
    pub doy: u32,
    pub tmax: f64,
    pub tmin: f64,
    pub tmean: f64,
    pub t30: f64,
    pub tdew: f64,
    pub rh_min: f64, // %
    pub ppt: f64,
    pub u2: f64,
    pub rs: f64,
    pub snow: f64,
    pub snow_depth: f64,
    pub co2: Option<Co2Factors>,
}

impl DailyMet {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }
}

/// Site scalars needed by the filler.
#[derive(Debug, Clone, Copy)]
pub struct WeatherSite {
    pub latitude: f64,
    pub elevation: f64,
    pub anemometer_height: f64,
    pub thornton_running: ThorntonRunning,
}

/// Checks that the records are strictly daily and ordered.
///
/// The season trigger fires on an exact day of year, so a skipped day could
/// silently suppress a season start.
pub fn check_contiguous(cell_id: &str, records: &[RawDailyMet]) -> Result<()> {
    for pair in records.windows(2) {
        let expected = pair[0].date.succ_opt();
        if expected != Some(pair[1].date) {
            return Err(CropEtError::MissingInput {
                cell_id: cell_id.to_string(),
                date: expected.unwrap_or(pair[1].date),
                field: "date".to_string(),
            });
        }
    }
    Ok(())
}

/// Linearly interpolates interior runs of at most `max_gap` NaNs in place.
pub fn interpolate_gaps(values: &mut [f64], max_gap: usize) {
    let n = values.len();
    let mut i = 0;
    while i < n {
        if values[i].is_finite() {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && !values[i].is_finite() {
            i += 1;
        }
        let gap = i - start;
        if start == 0 || i == n || gap > max_gap {
            continue;
        }
        let before = values[start - 1];
        let after = values[i];
        for (k, v) in values[start..i].iter_mut().enumerate() {
            let frac = (k + 1) as f64 / (gap + 1) as f64;
            *v = before + frac * (after - before);
        }
    }
}

/// Backward running mean over `window` days, ignoring missing values.
pub fn backward_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let lo = (i + 1).saturating_sub(window);
            let (sum, count) = values[lo..=i]
                .iter()
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

fn bounded_temperature(t: Option<f64>) -> f64 {
    match t {
        Some(t) if t.is_finite() && (MIN_AIR_TEMP..=MAX_AIR_TEMP).contains(&t) => t,
        _ => f64::NAN,
    }
}

fn or_nan(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(f64::NAN)
}

/// Fills a contiguous raw series and derives the cell climatology.
///
/// Order: bound temperatures, derive Tdew from specific humidity, rescale wind to 2 m, bridge gaps of up to
/// [`MAX_INTERP_DAYS`] by interpolation, fall back to monthly climatology (Tdew as Tmin - Ko), enforce Tmax >= Tmin,
/// estimate missing Rs with Thornton-Running, then derive Tmean, T30 and RHmin.
///
/// # Parameters
///
/// - `raw`: the cell's weather, already checked with [`check_contiguous`].
/// - `site`: latitude, elevation, anemometer height and Thornton-Running coefficients.
/// - `configured`: optional climatology from the cell table; it fills months the data cannot.
///
/// # Returns
///
/// The filled daily frame and the cell climatology.
pub fn fill_weather(
    raw: &[RawDailyMet],
    site: &WeatherSite,
    configured: Option<&MonthlyClimatology>,
) -> (Vec<DailyMet>, Climatology) {
    let dates: Vec<NaiveDate> = raw.iter().map(|r| r.date).collect();
    let pressure = air_pressure(site.elevation);

    let mut tmax: Vec<f64> = raw.iter().map(|r| bounded_temperature(r.tmax)).collect();
    let mut tmin: Vec<f64> = raw.iter().map(|r| bounded_temperature(r.tmin)).collect();
    let mut tdew: Vec<f64> = raw
        .iter()
        .map(|r| match (r.tdew, r.q) {
            (Some(t), _) if t.is_finite() => t,
            (_, Some(q)) if q.is_finite() && q > 0.0 => {
                tdew_from_ea(ea_from_specific_humidity(q, pressure))
            }
            _ => f64::NAN,
        })
        .collect();
    let mut wind: Vec<f64> = raw
        .iter()
        .map(|r| match r.wind {
            Some(w) if w.is_finite() && w >= 0.0 => wind_to_2m(w, site.anemometer_height),
            _ => f64::NAN,
        })
        .collect();

    for series in [&mut tmax, &mut tmin, &mut tdew, &mut wind] {
        interpolate_gaps(series, MAX_INTERP_DAYS);
    }

    let from_data = MonthlyClimatology::from_series(&dates, &tmax, &tmin, &tdew, &wind);
    let monthly = match configured {
        Some(c) => c.merged_with(&from_data),
        None => from_data,
    };

    let mut filled_days = 0usize;
    for (i, date) in dates.iter().enumerate() {
        let m = date.month0() as usize;
        if !tmax[i].is_finite() {
            tmax[i] = monthly.tmax[m];
            filled_days += 1;
        }
        if !tmin[i].is_finite() {
            tmin[i] = monthly.tmin[m];
            filled_days += 1;
        }
        if !tdew[i].is_finite() {
            tdew[i] = tmin[i] - monthly.ko[m];
            filled_days += 1;
        }
        if !wind[i].is_finite() {
            wind[i] = monthly.wind[m];
            filled_days += 1;
        }
        // Ensure max_temp is not below min_temp
        if tmax[i].is_finite() && tmin[i].is_finite() {
            tmax[i] = tmax[i].max(tmin[i]);
        }
    }
    if filled_days > 0 {
        debug!(filled_days, "filled weather values from monthly climatology");
    }

    let tmean: Vec<f64> = tmax.iter().zip(&tmin).map(|(x, n)| 0.5 * (x + n)).collect();
    let t30 = backward_mean(&tmean, T30_DAYS);
    let climatology = Climatology::new(monthly, &dates, &tmax, &tmin);

    let met = raw
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let doy = r.date.ordinal();
            let m = r.date.month0() as usize;
            let rs = match r.rs {
                Some(rs) if rs.is_finite() && rs >= 0.0 => rs,
                _ => site.thornton_running.estimate_rs(
                    tmax[i],
                    tmin[i],
                    climatology.monthly.tmax[m],
                    climatology.monthly.tmin[m],
                    site.latitude,
                    site.elevation,
                    doy,
                ),
            };
            let co2 = if r.co2_grass.is_some() || r.co2_tree.is_some() || r.co2_c4.is_some() {
                Some(Co2Factors {
                    grass: r.co2_grass.unwrap_or(1.0),
                    tree: r.co2_tree.unwrap_or(1.0),
                    c4: r.co2_c4.unwrap_or(1.0),
                })
            } else {
                None
            };
            DailyMet {
                date: r.date,
                doy,
                tmax: tmax[i],
                tmin: tmin[i],
                tmean: tmean[i],
                t30: t30[i],
                tdew: tdew[i],
                rh_min: rh_min(tdew[i], tmax[i]),
                ppt: or_nan(r.ppt).max(0.0),
                u2: wind[i],
                rs,
                snow: r.snow.unwrap_or(0.0),
                snow_depth: r.snow_depth.unwrap_or(0.0),
                co2,
            }
        })
        .collect();

    (met, climatology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn site() -> WeatherSite {
        WeatherSite {
            latitude: 40.0,
            elevation: 1000.0,
            anemometer_height: 2.0,
            thornton_running: ThorntonRunning::default(),
        }
    }

    fn series(start: NaiveDate, days: usize) -> Vec<RawDailyMet> {
        start
            .iter_days()
            .take(days)
            .map(|date| {
                let mut r = RawDailyMet::empty(date);
                r.tmax = Some(25.0);
                r.tmin = Some(10.0);
                r.tdew = Some(5.0);
                r.wind = Some(2.0);
                r.rs = Some(20.0);
                r.ppt = Some(0.0);
                r
            })
            .collect()
    }

    #[test]
    fn test_interpolate_short_gap() {
        let mut v = vec![1.0, f64::NAN, f64::NAN, f64::NAN, 5.0];
        interpolate_gaps(&mut v, 3);
        assert_eq!(v, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    // Should leave gaps longer than the cap and edge gaps untouched
    fn test_interpolate_long_and_edge_gaps() {
        let mut v = vec![1.0, f64::NAN, f64::NAN, f64::NAN, f64::NAN, 6.0, f64::NAN];
        interpolate_gaps(&mut v, 3);
        assert!(v[1..5].iter().all(|x| x.is_nan()));
        assert!(v[6].is_nan());
    }

    #[test]
    fn test_backward_mean() {
        let v = vec![1.0, 2.0, 3.0, f64::NAN, 5.0];
        let m = backward_mean(&v, 3);
        assert_abs_diff_eq!(m[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[2], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[4], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_contiguity_check() {
        let start = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        let mut raw = series(start, 10);
        assert!(check_contiguous("c1", &raw).is_ok());
        raw.remove(4);
        let err = check_contiguous("c1", &raw).unwrap_err();
        match err {
            CropEtError::MissingInput { date, field, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2001, 1, 5).unwrap());
                assert_eq!(field, "date");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    // Should fill a long Tmax gap from the monthly mean and Tdew from Tmin - Ko
    fn test_fill_from_monthly_climatology() {
        let start = NaiveDate::from_ymd_opt(2001, 6, 1).unwrap();
        let mut raw = series(start, 30);
        for r in raw.iter_mut().skip(10).take(6) {
            r.tmax = None;
            r.tdew = None;
        }
        let (met, clim) = fill_weather(&raw, &site(), None);
        assert_abs_diff_eq!(clim.monthly.tmax[5], 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(clim.monthly.ko[5], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(met[12].tmax, 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(met[12].tdew, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fill_enforces_tmax_above_tmin_and_bounds() {
        let start = NaiveDate::from_ymd_opt(2001, 6, 1).unwrap();
        let mut raw = series(start, 5);
        raw[2].tmax = Some(8.0);
        raw[3].tmin = Some(-99.0);
        let (met, _) = fill_weather(&raw, &site(), None);
        assert_eq!(met[2].tmax, 10.0);
        // -99 is out of bounds and interpolated from neighbors
        assert_abs_diff_eq!(met[3].tmin, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tdew_from_specific_humidity_and_rs_estimate() {
        let start = NaiveDate::from_ymd_opt(2001, 7, 1).unwrap();
        let mut raw = series(start, 10);
        for r in raw.iter_mut() {
            r.tdew = None;
            r.q = Some(0.008);
            r.rs = None;
        }
        let (met, _) = fill_weather(&raw, &site(), None);
        assert!(met[0].tdew > 5.0 && met[0].tdew < 12.0);
        assert!(met[0].rs > 5.0 && met[0].rs < 35.0);
        assert!(met[0].rh_min > 0.0 && met[0].rh_min < 100.0);
    }

    #[test]
    fn test_wind_rescaled_to_two_meters() {
        let start = NaiveDate::from_ymd_opt(2001, 7, 1).unwrap();
        let raw = series(start, 3);
        let mut s = site();
        s.anemometer_height = 10.0;
        let (met, _) = fill_weather(&raw, &s, None);
        assert_abs_diff_eq!(met[0].u2, wind_to_2m(2.0, 10.0), epsilon = 1e-12);
    }
}
