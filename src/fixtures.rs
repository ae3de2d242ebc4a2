//! Shared builders for unit tests.

use crate::crop_coefficients::CropCatalog;
use crate::crop_params::{CropParameters, CurveType, SeasonTrigger};
use crate::state::CropDayState;
use crate::weather::DailyMet;
use chrono::{Datelike, NaiveDate};
use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

pub fn catalog() -> CropCatalog {
    CropCatalog::load(
        &data_dir().join("crop_params.toml"),
        &data_dir().join("crop_coefs.toml"),
    )
    .unwrap()
}

pub fn crop(class_number: u32) -> CropParameters {
    catalog().crop(class_number).unwrap().clone()
}

pub fn corn() -> CropParameters {
    CropParameters {
        class_number: 7,
        name: "Field corn".to_string(),
        curve_number: 7,
        curve_name: "Field corn".to_string(),
        curve_type: CurveType::Ncgdd,
        season_trigger: SeasonTrigger::Cgdd,
        t30_for_pl_or_gu_or_cgdd: 112.0,
        date_of_pl_or_gu: 0.0,
        cgdd_for_efc: 800.0,
        cgdd_for_termination: 1600.0,
        time_for_efc: 0.0,
        time_for_harvest: 0.0,
        killing_frost_temperature: -2.0,
        gdd_trigger_doy: 1,
        gdd_base_c: 10.0,
        gdd_max_c: 30.0,
        mad_initial: 0.4,
        mad_mid: 0.5,
        height_min: 0.02,
        height_max: 2.5,
        cutting_crop: false,
        co2_family: Default::default(),
    }
}

pub fn winter_grain() -> CropParameters {
    crop(13)
}

pub fn cover(class_number: u32) -> CropParameters {
    crop(class_number)
}

pub fn state(crop: &CropParameters) -> CropDayState {
    CropDayState::new(crop)
}

pub fn date_from_doy(year: i32, doy: u32) -> NaiveDate {
    NaiveDate::from_yo_opt(year, doy).unwrap()
}

pub fn met(date: NaiveDate, tmax: f64, tmin: f64) -> DailyMet {
    DailyMet {
        date,
        doy: date.ordinal(),
        tmax,
        tmin,
        tmean: 0.5 * (tmax + tmin),
        t30: 0.5 * (tmax + tmin),
        tdew: tmin - 2.0,
        rh_min: 45.0,
        ppt: 0.0,
        u2: 2.0,
        rs: 20.0,
        snow: 0.0,
        snow_depth: 0.0,
        co2: None,
    }
}

pub fn met_on_doy(year: i32, doy: u32) -> DailyMet {
    met(date_from_doy(year, doy), 25.0, 10.0)
}
