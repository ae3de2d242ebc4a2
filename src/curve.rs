use crate::crop_coefficients::{CropCatalog, CropCoefficientCurve};
use crate::crop_params::{CropKind, CropParameters, CurveType};
use crate::error::{CropEtError, Result, SeasonEvent};
use crate::gdd::days_since_trigger;
use crate::season::LATEST_GREENUP_DAYS;
use crate::state::{CropDayState, MIN_HEIGHT};
use crate::weather::DailyMet;

/// Season position at which MAD switches to its mid-season value for curves normalized to effective full cover.
const MAD_SWITCH_EFC: f64 = 1.0;

/// Season position at which MAD switches for curves normalized to termination.
const MAD_SWITCH_TERMINATION: f64 = 0.5;

/// Curve rows used by one crop. Alfalfa carries its intermediate and last cycle rows.
#[derive(Debug, Clone, Copy)]
pub struct CropCurves<'a> {
    pub first: &'a CropCoefficientCurve,
    pub intermediate: Option<&'a CropCoefficientCurve>,
    pub last: Option<&'a CropCoefficientCurve>,
}

impl<'a> CropCurves<'a> {
    pub fn for_crop(crop: &CropParameters, catalog: &'a CropCatalog) -> Result<CropCurves<'a>> {
        let lookup = |curve: u32| {
            catalog.curve(curve).ok_or(CropEtError::UnknownCurve {
                class: crop.class_number,
                curve,
            })
        };
        let first = lookup(crop.curve_number)?;
        let (intermediate, last) = if crop.kind().is_alfalfa() {
            (
                Some(lookup(crop.curve_number + 1)?),
                Some(lookup(crop.curve_number + 2)?),
            )
        } else {
            (None, None)
        };
        Ok(CropCurves {
            first,
            intermediate,
            last,
        })
    }

    /// Row for cutting cycle `cycle` given the number of cuttings expected in the season.
    pub fn for_cycle(&self, cycle: u32, cuttings: u32) -> &'a CropCoefficientCurve {
        if cycle <= 1 {
            return self.first;
        }
        let row = if (cycle as f64) < cuttings as f64 + 0.01 - 1.0 {
            self.intermediate
        } else {
            self.last
        };
        row.unwrap_or(self.first)
    }
}

/// Per-crop settings of the curve evaluation.
#[derive(Debug, Clone, Copy)]
pub struct CurveSettings {
    pub crop_one_flag: bool,
    pub crop_one_reducer: f64,
    /// Cuttings per season for this crop's hay type.
    pub cuttings: u32,
}

fn mad_for(crop: &CropParameters, position: f64, switch: f64) -> f64 {
    if position < switch {
        crop.mad_initial
    } else {
        crop.mad_mid
    }
}

/// Evaluates the basal crop coefficient curve for one in-season day.
///
/// # Parameters
///
/// - `state`: the cell–crop state, in season.
/// - `crop`: the crop parameters.
/// - `curves`: the crop's coefficient rows.
/// - `settings`: crop-one handling and the cutting count.
/// - `met`: today's weather.
/// - `cell_id`: used only for error reporting.
///
/// # Returns
///
/// The season event raised today, if any. Errors with `UnexpectedSeasonLength` when a
/// termination-normalized crop started after mid-July.
pub fn update_curve(
    state: &mut CropDayState,
    crop: &CropParameters,
    curves: &CropCurves,
    settings: &CurveSettings,
    met: &DailyMet,
    cell_id: &str,
) -> Result<Option<SeasonEvent>> {
    let event = match crop.curve_type {
        CurveType::Ncgdd => ncgdd(state, crop, curves, settings, met.doy),
        CurveType::PercentPlEc => percent_pl_ec(state, crop, curves.first, met.doy),
        CurveType::PercentPlEcDaysAfter => days_after_ec(state, crop, curves.first, met.doy),
        CurveType::PercentPlTermination => {
            percent_pl_termination(state, crop, curves.first, met.doy, cell_id)?
        }
    };
    Ok(event)
}

fn ncgdd(
    state: &mut CropDayState,
    crop: &CropParameters,
    curves: &CropCurves,
    settings: &CurveSettings,
    doy: u32,
) -> Option<SeasonEvent> {
    let kind = crop.kind();
    let multi_cycle = kind.is_multi_cycle(settings.crop_one_flag);

    if crop.time_for_harvest > 10.0 && state.days_into_season(doy) as f64 > crop.time_for_harvest {
        state.end_season();
        return Some(SeasonEvent::HarvestTermination);
    }

    let (efc, termination) = if !multi_cycle {
        (crop.cgdd_for_efc, crop.cgdd_for_termination)
    } else if state.cycle == 1 {
        // The first cycle is cut at effective full cover
        (crop.cgdd_for_efc, crop.cgdd_for_efc)
    } else {
        (crop.cgdd_for_termination, crop.cgdd_for_termination)
    };
    let curve = curves.for_cycle(state.cycle, settings.cuttings);

    let cgdd_in_season = (state.cgdd - state.cgdd_at_planting).max(0.0);
    let efc = efc.max(1.0);
    let n = cgdd_in_season / efc;
    state.n_cgdd = n;
    state.mad = mad_for(crop, n, MAD_SWITCH_EFC);

    let mut event = None;
    if cgdd_in_season < efc {
        state.kc_bas = curve.interpolate(n * 10.0);
    } else if cgdd_in_season < termination {
        state.kc_bas = curve.interpolate(n.max(1.0) * 10.0);
    } else if multi_cycle || crop.cutting_crop {
        state.cutting = true;
        state.cycle += 1;
        state.cgdd_at_planting = state.cgdd;
        state.n_cgdd = 0.0;
        state.height = crop.height_min.max(MIN_HEIGHT);
        state.kc_bas = curves.for_cycle(state.cycle, settings.cuttings).first();
        event = Some(SeasonEvent::Cutting);
    } else {
        state.kc_bas = curve.interpolate(n * 10.0);
        state.end_season();
        event = Some(SeasonEvent::CgddTermination);
    }

    if kind == CropKind::AlfalfaPeak && settings.crop_one_flag {
        state.kc_bas *= settings.crop_one_reducer;
    }
    event
}

fn percent_pl_ec(
    state: &mut CropDayState,
    crop: &CropParameters,
    curve: &CropCoefficientCurve,
    doy: u32,
) -> Option<SeasonEvent> {
    let days = state.days_into_season(doy) as f64;
    let n = days / crop.time_for_efc.max(1.0);
    state.n_pl_ec = n;
    state.mad = mad_for(crop, n, MAD_SWITCH_EFC);

    if n * 100.0 <= crop.time_for_harvest.abs() {
        state.kc_bas = curve.interpolate(n * 10.0);
        None
    } else if crop.time_for_harvest < -0.5 {
        // Held until a killing frost ends the season
        state.kc_bas = state.kc_bas_prev;
        None
    } else {
        state.end_season();
        Some(SeasonEvent::HarvestTermination)
    }
}

fn days_after_ec(
    state: &mut CropDayState,
    crop: &CropParameters,
    curve: &CropCoefficientCurve,
    doy: u32,
) -> Option<SeasonEvent> {
    let days = state.days_into_season(doy) as f64;
    let time_for_efc = crop.time_for_efc.max(1.0);
    let n = days / time_for_efc;
    state.n_pl_ec = n;
    state.mad = mad_for(crop, n, MAD_SWITCH_EFC);

    if n < 1.0 {
        state.kc_bas = curve.interpolate(n * 10.0);
        return None;
    }
    let days_after = days - time_for_efc;
    if days_after <= crop.time_for_harvest.abs() {
        state.kc_bas = curve.interpolate(10.0 + days_after / 10.0);
        None
    } else if crop.time_for_harvest < -0.5 {
        state.kc_bas = state.kc_bas_prev;
        None
    } else {
        state.end_season();
        Some(SeasonEvent::HarvestTermination)
    }
}

fn percent_pl_termination(
    state: &mut CropDayState,
    crop: &CropParameters,
    curve: &CropCoefficientCurve,
    doy: u32,
    cell_id: &str,
) -> Result<Option<SeasonEvent>> {
    let start_since = days_since_trigger(state.doy_start_cycle, crop.gdd_trigger_doy);
    if start_since >= LATEST_GREENUP_DAYS {
        return Err(CropEtError::UnexpectedSeasonLength {
            cell_id: cell_id.to_string(),
            class: crop.class_number,
            doy_start: state.doy_start_cycle,
        });
    }
    let mut length = 2.0 * (LATEST_GREENUP_DAYS - start_since) as f64;
    if crop.kind() == CropKind::CheatGrass {
        if length < 60.0 {
            length = 60.0;
        } else if length > 90.0 {
            length = 100.0;
        }
    }

    let n = state.days_into_season(doy) as f64 / length;
    state.n_pl_ec = n;
    state.mad = mad_for(crop, n, MAD_SWITCH_TERMINATION);
    state.kc_bas = curve.interpolate(n.min(1.0) * 10.0);
    if n > 1.0 {
        state.end_season();
        return Ok(Some(SeasonEvent::HarvestTermination));
    }
    Ok(None)
}

/// Crop height from the progress of Kcb between the curve's first value and its peak.
pub fn update_height(state: &mut CropDayState, crop: &CropParameters, curve: &CropCoefficientCurve) {
    let h_min = crop.height_min.max(MIN_HEIGHT);
    let h_max = crop.height_max.max(h_min);
    let span = curve.peak() - curve.first();
    let progress = if span > 1e-6 {
        ((state.kc_bas - curve.first()) / span).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let height = h_min + (h_max - h_min) * progress;
    // Height only resets at a cutting or the end of the season
    state.height = if state.cutting { h_min } else { height.max(state.height) };
}
