use crate::crop_params::{CropKind, CropParameters};
use crate::error::SeasonEvent;
use crate::gdd::days_since_trigger;
use crate::state::{CropDayState, DORMANT_KCB};
use crate::weather::DailyMet;

/// Days after `gdd_trigger_doy` from which autumn frost is evaluated (about August 1).
pub const AUTUMN_FROST_DAYS: u32 = 211;

/// Minimum temperature that starts the alfalfa cold-shock counter [C].
pub const COLD_SHOCK_TEMP: f64 = -3.0;

/// Kcb discount per day since the first autumn cold shock.
pub const COLD_SHOCK_RATE: f64 = 0.005;

/// Progressive autumn Kcb discount for alfalfa after the first hard freeze.
///
/// The counter stays at zero until `AUTUMN_FROST_DAYS` past the trigger DOY, starts on the first day with Tmin below
/// `COLD_SHOCK_TEMP`, and from then on lowers Kcb by `0.005 * T2Days` each day, never below 0.1.
pub fn cold_shock(state: &mut CropDayState, crop: &CropParameters, met: &DailyMet) {
    if !crop.kind().is_alfalfa() {
        return;
    }
    if days_since_trigger(met.doy, crop.gdd_trigger_doy) <= AUTUMN_FROST_DAYS {
        state.t2_days = 0;
        return;
    }
    if state.t2_days > 0 {
        state.kc_bas = (state.kc_bas - COLD_SHOCK_RATE * state.t2_days as f64).max(DORMANT_KCB);
        state.t2_days += 1;
    } else if met.tmin < COLD_SHOCK_TEMP {
        state.t2_days = 1;
    }
}

/// Ends the season on the first autumn day with Tmin below the crop's killing frost temperature.
///
/// # Returns
///
/// `Some(SeasonEvent::FrostTermination)` when the season ended today.
pub fn killing_frost(
    state: &mut CropDayState,
    crop: &CropParameters,
    met: &DailyMet,
) -> Option<SeasonEvent> {
    if matches!(crop.kind(), CropKind::WinterCover(_)) || !state.in_season {
        return None;
    }
    if days_since_trigger(met.doy, crop.gdd_trigger_doy) > AUTUMN_FROST_DAYS
        && met.tmin < crop.killing_frost_temperature
    {
        state.end_season();
        return Some(SeasonEvent::FrostTermination);
    }
    None
}
