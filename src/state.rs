use crate::crop_params::CropParameters;

/// Basal crop coefficient used outside the growing season (bare, mulched or dormant surface).
pub const DORMANT_KCB: f64 = 0.1;

/// Lower bound on crop height [m].
pub const MIN_HEIGHT: f64 = 0.05;

/// Mutable state of one crop on one cell, advanced one day at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct CropDayState {
    pub in_season: bool,
    pub real_start: bool,
    pub dormant_setup_flag: bool,
    pub stress_event: bool,
    /// Day of year the current cycle started; 0 while no start is pending.
    pub doy_start_cycle: u32,
    pub cgdd_at_planting: f64,
    pub cgdd: f64,
    pub n_cgdd: f64,
    pub n_pl_ec: f64,
    pub cycle: u32,
    pub t2_days: u32,
    pub kc_bas: f64,
    /// Yesterday's Kcb before CO2 and climate adjustment.
    pub kc_bas_prev: f64,
    pub height: f64,
    pub mad: f64,
    pub cutting: bool,
    /// Set until the first day has been processed.
    pub first_day: bool,
}

impl CropDayState {
    pub fn new(crop: &CropParameters) -> Self {
        CropDayState {
            in_season: false,
            real_start: false,
            dormant_setup_flag: false,
            stress_event: false,
            doy_start_cycle: 0,
            cgdd_at_planting: 0.0,
            cgdd: 0.0,
            n_cgdd: 0.0,
            n_pl_ec: 0.0,
            cycle: 1,
            t2_days: 0,
            kc_bas: DORMANT_KCB,
            kc_bas_prev: DORMANT_KCB,
            height: crop.height_min.max(MIN_HEIGHT),
            mad: crop.mad_initial,
            cutting: false,
            first_day: true,
        }
    }

    /// Days since the current cycle started, counting the start day as day 1.
    pub fn days_into_season(&self, doy: u32) -> i64 {
        let mut days = doy as i64 - self.doy_start_cycle as i64 + 1;
        if days < 1 {
            days += 365;
        }
        days
    }

    /// Ends the season for the rest of the cycle.
    pub fn end_season(&mut self) {
        self.in_season = false;
        self.stress_event = false;
    }
}
