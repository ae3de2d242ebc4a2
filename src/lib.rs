pub mod adjust;
pub mod cell;
pub mod climate;
pub mod climatology;
pub mod config;
pub mod crop_coefficients;
pub mod crop_params;
pub mod curve;
pub mod daily;
pub mod error;
pub mod frost;
pub mod gdd;
pub mod output;
pub mod overrides;
pub mod refet;
pub mod run;
pub mod season;
pub mod solar;
pub mod state;
pub mod units;
pub mod weather;

#[cfg(test)]
mod fixtures;

pub use adjust::adjust_kc;
pub use cell::{EtCell, PreparedCell};
pub use config::RunConfig;
pub use crop_coefficients::{CropCatalog, CropCoefficientCurve};
pub use crop_params::{CropKind, CropParameters, CurveType, SeasonTrigger};
pub use daily::{run_crop, CropDriver, DailyKcbRow, NoSoilWater, SoilWaterModel};
pub use error::{CropEtError, Result, SeasonEvent};
pub use gdd::calculate_gdd;
pub use overrides::{AerodynamicLake, OpenWaterEvaporation};
pub use refet::{compute_refet, RefEtMethod, RefEtType};
pub use run::{run, RunSummary};
pub use state::CropDayState;
