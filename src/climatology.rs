use crate::gdd::calculate_gdd;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Monthly means used to fill weather gaps. Index 0 is January. NaN marks a month without data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClimatology {
    pub tmax: [f64; 12], // C
    pub tmin: [f64; 12], // C
    pub ko: [f64; 12],   // dew point depression Tmin - Tdew [C]
    pub wind: [f64; 12], // m/s at 2 m
}

fn monthly_mean(dates: &[NaiveDate], values: &[f64]) -> [f64; 12] {
    let mut sums = [0.0; 12];
    let mut counts = [0usize; 12];
    for (date, v) in dates.iter().zip(values) {
        if v.is_finite() {
            let m = date.month0() as usize;
            sums[m] += v;
            counts[m] += 1;
        }
    }
    let mut means = [f64::NAN; 12];
    for m in 0..12 {
        if counts[m] > 0 {
            means[m] = sums[m] / counts[m] as f64;
        }
    }
    means
}

impl MonthlyClimatology {
    /// Builds the monthly means from a (possibly gappy) daily series. NaN values are skipped.
    pub fn from_series(
        dates: &[NaiveDate],
        tmax: &[f64],
        tmin: &[f64],
        tdew: &[f64],
        wind: &[f64],
    ) -> MonthlyClimatology {
        let depression: Vec<f64> = tmin.iter().zip(tdew).map(|(n, d)| n - d).collect();
        MonthlyClimatology {
            tmax: monthly_mean(dates, tmax),
            tmin: monthly_mean(dates, tmin),
            ko: monthly_mean(dates, &depression),
            wind: monthly_mean(dates, wind),
        }
    }

    /// Fills months without data from any configured fallback.
    pub fn merged_with(&self, fallback: &MonthlyClimatology) -> MonthlyClimatology {
        fn pick(a: &[f64; 12], b: &[f64; 12]) -> [f64; 12] {
            let mut out = *a;
            for m in 0..12 {
                if !out[m].is_finite() {
                    out[m] = b[m];
                }
            }
            out
        }
        MonthlyClimatology {
            tmax: pick(&self.tmax, &fallback.tmax),
            tmin: pick(&self.tmin, &fallback.tmin),
            ko: pick(&self.ko, &fallback.ko),
            wind: pick(&self.wind, &fallback.wind),
        }
    }
}

/// Per-cell climatology: monthly means plus the long-term day-of-year anchors
/// used to clamp the start of season.
#[derive(Debug, Clone, PartialEq)]
pub struct Climatology {
    pub monthly: MonthlyClimatology,
    /// Long-term mean daily maximum temperature, index = DOY - 1.
    pub tmax_lt: Vec<f64>,
    /// Long-term mean daily minimum temperature, index = DOY - 1.
    pub tmin_lt: Vec<f64>,
    /// Cumulative base-0 GDD of the long-term mean year, index = DOY - 1.
    pub cgdd_0_lt: Vec<f64>,
    /// 30-day mean of the long-term mean daily temperature, index = DOY - 1.
    pub t30_lt: Vec<f64>,
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Slot of a date in the mean year. Days are aligned by month and day, so February 29 shares the February 28 slot
/// and slot 365 is only ever borrowed from December 31.
fn mean_year_slot(date: &NaiveDate) -> usize {
    let i = date.ordinal0() as usize;
    if is_leap_year(date.year()) && i >= 59 {
        i - 1
    } else {
        i
    }
}

fn day_of_year_mean(dates: &[NaiveDate], values: &[f64]) -> Vec<f64> {
    let mut sums = [0.0; 366];
    let mut counts = [0usize; 366];
    for (date, v) in dates.iter().zip(values) {
        if v.is_finite() {
            let i = mean_year_slot(date);
            sums[i] += v;
            counts[i] += 1;
        }
    }
    let mut means = vec![f64::NAN; 366];
    for i in 0..366 {
        if counts[i] > 0 {
            means[i] = sums[i] / counts[i] as f64;
        }
    }
    // Slot 365 and any other unsampled day borrow the previous day
    for i in 0..366 {
        if !means[i].is_finite() {
            means[i] = if i > 0 { means[i - 1] } else { 0.0 };
        }
    }
    means
}

impl Climatology {
    /// Derives the long-term anchors from filled daily temperature extremes.
    pub fn new(monthly: MonthlyClimatology, dates: &[NaiveDate], tmax: &[f64], tmin: &[f64]) -> Climatology {
        let tmax_lt = day_of_year_mean(dates, tmax);
        let tmin_lt = day_of_year_mean(dates, tmin);
        let tmean_lt: Vec<f64> = tmax_lt.iter().zip(&tmin_lt).map(|(x, n)| 0.5 * (x + n)).collect();

        // The mean year is cyclic, so the window wraps into December
        let t30_lt = (0..366)
            .map(|i| (0..30).map(|k| tmean_lt[(i + 366 - k) % 366]).sum::<f64>() / 30.0)
            .collect();

        let mut climatology = Climatology {
            monthly,
            tmax_lt,
            tmin_lt,
            cgdd_0_lt: Vec::new(),
            t30_lt,
        };
        climatology.cgdd_0_lt = climatology.cgdd_lt(0.0, f64::INFINITY);
        climatology
    }

    /// Cumulative GDD of the long-term mean year with a crop's base and cap temperatures, index = DOY - 1.
    pub fn cgdd_lt(&self, base_temp: f64, max_cap: f64) -> Vec<f64> {
        let mut total = 0.0;
        self.tmax_lt
            .iter()
            .zip(&self.tmin_lt)
            .map(|(&tmax, &tmin)| {
                total += calculate_gdd(tmax, tmin, base_temp, max_cap);
                total
            })
            .collect()
    }

    pub fn cgdd_0_lt(&self, doy: u32) -> f64 {
        self.cgdd_0_lt[(doy.clamp(1, 366) - 1) as usize]
    }

    pub fn t30_lt(&self, doy: u32) -> f64 {
        self.t30_lt[(doy.clamp(1, 366) - 1) as usize]
    }
}

/// First DOY (1-based) on which a long-term anchor crosses `threshold` upward.
///
/// # Returns
///
/// The DOY of the crossing, or 0 when the anchor never crosses within the year.
pub fn first_crossing(anchor: &[f64], threshold: f64) -> u32 {
    for j in 1..anchor.len() {
        if anchor[j - 1] <= threshold && anchor[j] > threshold {
            return j as u32 + 1;
        }
    }
    0
}
