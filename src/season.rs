//! Start-of-season state machine for the four planting/greenup triggers.

use crate::climatology::{first_crossing, Climatology};
use crate::crop_params::{CropParameters, SeasonTrigger};
use crate::gdd::days_since_trigger;
use crate::state::CropDayState;
use crate::weather::DailyMet;
use chrono::{Datelike, NaiveDate};
use tracing::debug;

/// Days after `gdd_trigger_doy` past which temperature triggers are no longer evaluated (about July 15).
pub const LATEST_GREENUP_DAYS: u32 = 195;

/// Allowed departure of the season start from the long-term mean start, in days.
pub const START_WINDOW_DAYS: u32 = 40;

/// Long-term mean start DOY for temperature-triggered crops, 0 when the anchor never crosses the threshold.
///
/// The CGDD anchor is accumulated with the crop's own base and cap so it is comparable with the live CGDD.
pub fn longterm_start(crop: &CropParameters, climatology: &Climatology) -> u32 {
    match crop.season_trigger {
        SeasonTrigger::Cgdd => first_crossing(
            &climatology.cgdd_lt(crop.gdd_base_c, crop.gdd_max_c),
            crop.t30_for_pl_or_gu_or_cgdd,
        ),
        SeasonTrigger::T30 => first_crossing(&climatology.t30_lt, crop.t30_for_pl_or_gu_or_cgdd),
        SeasonTrigger::Date | SeasonTrigger::AlwaysOn => 0,
    }
}

/// Wraps a possibly out-of-range DOY into 1..=365.
pub fn wrap_doy(doy: i64) -> u32 {
    let mut d = doy;
    while d < 1 {
        d += 365;
    }
    while d > 365 {
        d -= 365;
    }
    d as u32
}

/// DOY of a fixed planting date encoded as `month.fraction`.
///
/// The integer part is the month (0 means December); the fraction times 30.4 is the day of month, defaulting to the
/// 15th when it rounds below half a day.
pub fn planting_doy(date_of_pl_or_gu: f64, year: i32) -> u32 {
    let mut month = date_of_pl_or_gu.trunc() as i64;
    if month <= 0 {
        month = 12;
    }
    let month = month.min(12) as u32;
    let day_f = date_of_pl_or_gu.fract() * 30.4;
    let day = if day_f < 0.5 { 15 } else { day_f.trunc().max(1.0) as u32 };

    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => {
            let month_len = (next - first).num_days() as u32;
            first.ordinal() + day.min(month_len) - 1
        }
        _ => 15,
    }
}

fn start_cycle(state: &mut CropDayState) {
    state.in_season = true;
    state.real_start = true;
    state.stress_event = false;
    state.dormant_setup_flag = true;
    state.cycle = 1;
    state.cgdd_at_planting = state.cgdd;
}

/// Re-arms the season triggers on `gdd_trigger_doy`.
///
/// Runs on every simulated day, including days whose weather is missing, so a gap on the trigger day cannot carry a
/// season into the next year. Returns `true` when today is a rollover day.
pub fn year_rollover(state: &mut CropDayState, crop: &CropParameters, doy: u32) -> bool {
    if state.first_day || days_since_trigger(doy, crop.gdd_trigger_doy) != 0 {
        return false;
    }
    match crop.season_trigger {
        SeasonTrigger::Cgdd | SeasonTrigger::T30 => {
            state.real_start = false;
            state.doy_start_cycle = 0;
            state.end_season();
        }
        SeasonTrigger::AlwaysOn => state.stress_event = false,
        SeasonTrigger::Date => {}
    }
    true
}

/// Advances the season trigger by one day.
///
/// # Parameters
///
/// - `state`: the cell–crop state; `cgdd` must already include today.
/// - `crop`: the crop parameters.
/// - `met`: today's filled weather.
/// - `longterm_pl`: the long-term mean start DOY from [`longterm_start`].
///
/// # Returns
///
/// `true` on the day a new season starts; the caller then initializes the rooting depth.
pub fn update_season(
    state: &mut CropDayState,
    crop: &CropParameters,
    met: &DailyMet,
    longterm_pl: u32,
) -> bool {
    let doy = met.doy;
    let since = days_since_trigger(doy, crop.gdd_trigger_doy);
    year_rollover(state, crop, doy);

    match crop.season_trigger {
        SeasonTrigger::Cgdd | SeasonTrigger::T30 => {
            if state.in_season || since >= LATEST_GREENUP_DAYS {
                return false;
            }
            let live = match crop.season_trigger {
                SeasonTrigger::Cgdd => state.cgdd,
                _ => met.t30,
            };
            let threshold = crop.t30_for_pl_or_gu_or_cgdd;

            if longterm_pl > 0 && doy > longterm_pl + START_WINDOW_DAYS && !state.real_start {
                debug!(
                    class = crop.class_number,
                    doy, longterm_pl, "too late for normal start, forcing season start"
                );
                state.doy_start_cycle = doy;
                state.real_start = true;
            } else if !state.real_start && live > threshold {
                if longterm_pl > 0 && (doy as i64) < longterm_pl as i64 - START_WINDOW_DAYS as i64 {
                    state.doy_start_cycle =
                        wrap_doy(longterm_pl as i64 - START_WINDOW_DAYS as i64);
                    debug!(
                        class = crop.class_number,
                        doy,
                        longterm_pl,
                        start = state.doy_start_cycle,
                        "too early, start clamped to long-term window"
                    );
                } else {
                    state.doy_start_cycle = doy;
                    state.real_start = true;
                }
            }

            if state.doy_start_cycle == doy {
                start_cycle(state);
                if crop.date_of_pl_or_gu < 0.0 {
                    state.doy_start_cycle = wrap_doy(
                        state.doy_start_cycle as i64 + crop.date_of_pl_or_gu.trunc() as i64,
                    );
                }
                return true;
            }
            false
        }
        SeasonTrigger::Date => {
            if state.in_season {
                return false;
            }
            let target = planting_doy(crop.date_of_pl_or_gu, met.year());
            // Winter grain already in the ground when the run begins
            let carried_in = state.first_day && target >= crop.gdd_trigger_doy;
            if doy == target || carried_in {
                state.doy_start_cycle = target;
                start_cycle(state);
                return true;
            }
            false
        }
        SeasonTrigger::AlwaysOn => {
            if state.first_day {
                state.doy_start_cycle = crop.gdd_trigger_doy;
                start_cycle(state);
                return true;
            }
            state.in_season = true;
            false
        }
    }
}
