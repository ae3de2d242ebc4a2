use crate::climatology::{Climatology, MonthlyClimatology};
use crate::config::RefEtConfig;
use crate::daily::CellContext;
use crate::error::{CropEtError, Result};
use crate::overrides::OpenWaterEvaporation;
use crate::refet::{compute_refet, RefEtInputs, RefEtMethod};
use crate::solar::ThorntonRunning;
use crate::weather::{check_contiguous, fill_weather, DailyMet, RawDailyMet, WeatherSite};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

fn default_anemometer_height() -> f64 {
    2.0
}

fn default_cuttings() -> u32 {
    4
}

/// An ET cell: a location with its weather site properties and the crops grown on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtCell {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub latitude: f64,  // decimal degrees
    pub longitude: f64, // decimal degrees
    pub elevation: f64, // m
    #[serde(default = "default_anemometer_height")]
    pub anemometer_height: f64, // m
    #[serde(default)]
    pub thornton_running: ThorntonRunning,
    #[serde(default = "default_cuttings")]
    pub dairy_cuttings: u32,
    #[serde(default = "default_cuttings")]
    pub beef_cuttings: u32,
    pub crops: Vec<u32>,
    #[serde(default)]
    pub climatology: Option<MonthlyClimatology>,
}

impl EtCell {
    pub fn site(&self) -> WeatherSite {
        WeatherSite {
            latitude: self.latitude,
            elevation: self.elevation,
            anemometer_height: self.anemometer_height,
            thornton_running: self.thornton_running,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CellsFile {
    cells: Vec<EtCell>,
}

/// Reads the `[[cells]]` table.
pub fn load_cells(path: &Path) -> Result<Vec<EtCell>> {
    let text = fs::read_to_string(path).map_err(|e| {
        CropEtError::Config(format!("cannot read cells file {}: {}", path.display(), e))
    })?;
    let file: CellsFile =
        toml::from_str(&text).map_err(|e| CropEtError::Config(e.to_string()))?;
    if file.cells.is_empty() {
        return Err(CropEtError::Config(format!("no cells in {}", path.display())));
    }
    info!(cells = file.cells.len(), "loaded cells");
    Ok(file.cells)
}

/// Reads the weather series of a cell from `<weather_dir>/<cell_id>.json`.
pub fn load_weather(weather_dir: &Path, cell_id: &str) -> Result<Vec<RawDailyMet>> {
    let path = weather_dir.join(format!("{cell_id}.json"));
    let met_err = |reason: String| CropEtError::MetLoad {
        cell_id: cell_id.to_string(),
        reason,
    };
    let text = fs::read_to_string(&path)
        .map_err(|e| met_err(format!("cannot open {}: {}", path.display(), e)))?;
    let mut records: Vec<RawDailyMet> =
        serde_json::from_str(&text).map_err(|e| met_err(e.to_string()))?;
    records.sort_by_key(|r| r.date);
    Ok(records)
}

/// A cell with its filled weather, climatology and reference ET, ready for the crop loop.
#[derive(Debug, Clone)]
pub struct PreparedCell {
    pub cell: EtCell,
    pub met: Vec<DailyMet>,
    pub climatology: Climatology,
    /// Reference ET of the driving method.
    pub etref: Vec<Option<f64>>,
    pub eto: Vec<Option<f64>>,
    pub etr: Vec<Option<f64>>,
}

impl PreparedCell {
    /// Checks, fills and windows the raw weather and computes reference ET.
    ///
    /// # Parameters
    ///
    /// - `cell`: the cell definition.
    /// - `raw`: the cell's full weather record, sorted by date.
    /// - `refet`: the reference ET methods.
    /// - `start`, `end`: optional simulation window; defaults to the full record.
    ///
    /// # Returns
    ///
    /// `MissingInput` when the record skips days, `MetLoad` when the window holds no rows.
    pub fn prepare(
        cell: EtCell,
        raw: &[RawDailyMet],
        refet: &RefEtConfig,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PreparedCell> {
        check_contiguous(&cell.id, raw)?;
        let (filled, climatology) = fill_weather(raw, &cell.site(), cell.climatology.as_ref());

        let met: Vec<DailyMet> = filled
            .into_iter()
            .filter(|m| start.map_or(true, |s| m.date >= s) && end.map_or(true, |e| m.date <= e))
            .collect();
        if met.is_empty() {
            return Err(CropEtError::MetLoad {
                cell_id: cell.id.clone(),
                reason: "no weather rows in the simulation window".to_string(),
            });
        }

        let series = |method: RefEtMethod| -> Vec<Option<f64>> {
            met.iter().map(|m| compute_refet(method, &refet_inputs(&cell, m))).collect()
        };
        let etref = series(refet.method);
        let eto = series(refet.eto_method());
        let etr = series(refet.etr_method());

        let missing = etref.iter().filter(|e| e.is_none()).count();
        if missing > 0 {
            debug!(cell_id = %cell.id, missing, method = %refet.method, "reference ET missing on some days");
        }
        debug!(
            cell_id = %cell.id,
            days = met.len(),
            first = %met[0].date,
            "prepared cell weather"
        );

        Ok(PreparedCell {
            cell,
            met,
            climatology,
            etref,
            eto,
            etr,
        })
    }

    pub fn context<'a>(&'a self, lake: &'a dyn OpenWaterEvaporation) -> CellContext<'a> {
        CellContext {
            cell_id: &self.cell.id,
            elevation: self.cell.elevation,
            climatology: &self.climatology,
            met: &self.met,
            etref: &self.etref,
            lake,
        }
    }
}

fn refet_inputs(cell: &EtCell, met: &DailyMet) -> RefEtInputs {
    RefEtInputs {
        tmax: met.tmax,
        tmin: met.tmin,
        tdew: met.tdew,
        rs: met.rs,
        u2: met.u2,
        elevation: cell.elevation,
        latitude: cell.latitude,
        doy: met.doy,
    }
}
