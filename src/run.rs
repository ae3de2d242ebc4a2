//! Outer driver: loads tables and cells, then runs every cell in parallel.

use crate::cell::{load_cells, load_weather, EtCell, PreparedCell};
use crate::config::RunConfig;
use crate::crop_coefficients::CropCatalog;
use crate::daily::{cuttings_for, run_crop, CropSettings, NoSoilWater, SeasonCounts};
use crate::error::{CropEtError, Result};
use crate::output::{save_crop_rows, save_refet};
use crate::overrides::AerodynamicLake;
use rayon::prelude::*;
use std::fs;
use tracing::{debug, info, warn};

/// Result of a completed cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellOutcome {
    pub cell_id: String,
    pub days: usize,
    pub crops_run: usize,
    /// Crops skipped because of a non-fatal error, with the error kind.
    pub crops_failed: Vec<(u32, &'static str)>,
    pub counts: SeasonCounts,
}

/// Completed and failed cells of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<CellOutcome>,
    pub failed: Vec<(String, CropEtError)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn add_counts(total: &mut SeasonCounts, counts: &SeasonCounts) {
    total.seasons += counts.seasons;
    total.cuttings += counts.cuttings;
    total.frost_terminations += counts.frost_terminations;
    total.harvest_terminations += counts.harvest_terminations;
    total.cgdd_terminations += counts.cgdd_terminations;
    total.missing_days += counts.missing_days;
}

/// Runs every crop of one cell and writes its output files.
pub fn run_cell(cell: &EtCell, catalog: &CropCatalog, config: &RunConfig) -> Result<CellOutcome> {
    let raw = load_weather(&config.project.weather_dir, &cell.id)?;
    let prepared = PreparedCell::prepare(
        cell.clone(),
        &raw,
        &config.refet,
        config.project.start_date,
        config.project.end_date,
    )?;
    save_refet(&config.project.output_dir, &prepared)?;

    let lake = AerodynamicLake;
    let context = prepared.context(&lake);
    let mut outcome = CellOutcome {
        cell_id: cell.id.clone(),
        days: prepared.met.len(),
        ..Default::default()
    };

    for &class_number in cell.crops.iter().filter(|c| config.runs_crop(**c)) {
        let crop = match catalog.crop(class_number) {
            Some(crop) => crop,
            None => {
                warn!(cell_id = %cell.id, class = class_number, "crop class not in crop table, skipped");
                continue;
            }
        };
        let settings = CropSettings {
            ref_type: config.refet.ref_type(),
            crop_one_flag: config.crop_et.crop_one_flag,
            crop_one_reducer: config.crop_et.crop_one_reducer,
            co2_flag: config.crop_et.co2_flag,
            cuttings: cuttings_for(crop.kind(), cell.dairy_cuttings, cell.beef_cuttings),
        };
        match run_crop(&context, crop, catalog, settings, &mut NoSoilWater) {
            Ok((rows, counts)) => {
                save_crop_rows(
                    &config.project.output_dir,
                    &cell.id,
                    class_number,
                    &rows,
                    crop.kind().is_open_water(),
                )?;
                debug!(cell_id = %cell.id, class = class_number, ?counts, "crop finished");
                add_counts(&mut outcome.counts, &counts);
                outcome.crops_run += 1;
            }
            Err(e) if !e.is_fatal() => {
                warn!(cell_id = %cell.id, class = class_number, kind = e.kind(), "crop failed: {}", e);
                outcome.crops_failed.push((class_number, e.kind()));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcome)
}

/// Runs a whole project.
///
/// Configuration and table errors abort before any cell starts. Cell failures are logged on one line each and
/// collected in the summary; the other cells continue.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;
    let mut catalog =
        CropCatalog::load(&config.project.crop_params_path, &config.project.crop_coefs_path)?;
    catalog.assign_co2_families(
        &config.crop_et.co2_grass_list,
        &config.crop_et.co2_tree_list,
        &config.crop_et.co2_c4_list,
    );
    let cells: Vec<EtCell> = load_cells(&config.project.cells_path)?
        .into_iter()
        .filter(|c| config.runs_cell(&c.id))
        .collect();
    if cells.is_empty() {
        return Err(CropEtError::Config("no cells selected".to_string()));
    }
    fs::create_dir_all(&config.project.output_dir)?;

    info!(
        cells = cells.len(),
        crops = catalog.len(),
        method = %config.refet.method,
        "starting run"
    );

    let results: Vec<(String, Result<CellOutcome>)> = cells
        .par_iter()
        .map(|cell| (cell.id.clone(), run_cell(cell, &catalog, config)))
        .collect();

    let mut summary = RunSummary::default();
    for (cell_id, result) in results {
        match result {
            Ok(outcome) => summary.completed.push(outcome),
            Err(e) => {
                warn!(cell_id = %cell_id, kind = e.kind(), "cell failed: {}", e);
                summary.failed.push((cell_id, e));
            }
        }
    }
    info!(
        completed = summary.completed.len(),
        failed = summary.failed.len(),
        "run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, CropEtConfig, ProjectConfig, RefEtConfig};
    use crate::fixtures;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn config(output_dir: PathBuf) -> RunConfig {
        let data = fixtures::data_dir();
        RunConfig {
            project: ProjectConfig {
                crop_params_path: data.join("crop_params.toml"),
                crop_coefs_path: data.join("crop_coefs.toml"),
                cells_path: data.join("cells.toml"),
                weather_dir: data.join("weather"),
                output_dir,
                start_date: None,
                end_date: None,
            },
            refet: RefEtConfig::default(),
            crop_et: CropEtConfig::default(),
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("crop_et_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_run_sample_project() {
        let dir = temp_dir("sample");
        let mut config = config(dir.clone());
        config.apply_overrides(ConfigOverrides {
            start_date: NaiveDate::from_ymd_opt(2001, 1, 1),
            cell_ids: Some(vec!["greeley".to_string()]),
            ..Default::default()
        });
        let summary = run(&config).unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.completed.len(), 1);
        let outcome = &summary.completed[0];
        assert_eq!(outcome.days, 365);
        assert_eq!(outcome.crops_run, 8);
        assert!(outcome.counts.seasons > 0);

        let corn = fs::read_to_string(dir.join("greeley_crop_07.csv")).unwrap();
        assert_eq!(corn.lines().count(), 366);
        let water = fs::read_to_string(dir.join("greeley_crop_55.csv")).unwrap();
        assert!(water.lines().next().unwrap().ends_with(",et"));
        assert!(dir.join("greeley_refet.csv").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_weather_fails_only_that_cell() {
        let dir = temp_dir("missing");
        let mut config = config(dir.clone());
        let weather = temp_dir("weather_only_greeley");
        fs::create_dir_all(&weather).unwrap();
        fs::copy(
            fixtures::data_dir().join("weather").join("greeley.json"),
            weather.join("greeley.json"),
        )
        .unwrap();
        config.project.weather_dir = weather.clone();
        config.crop_et.crop_classes = Some(vec![7, 44]);

        let summary = run(&config).unwrap();
        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "walden");
        assert_eq!(summary.failed[0].1.kind(), "MetLoadError");
        let _ = fs::remove_dir_all(&dir);
        let _ = fs::remove_dir_all(&weather);
    }

    #[test]
    fn test_bad_table_aborts_run() {
        let mut config = config(temp_dir("bad_table"));
        config.project.crop_params_path = PathBuf::from("/nonexistent/crop_params.toml");
        let err = run(&config).unwrap_err();
        assert_eq!(err.kind(), "TableLoadError");
    }
}
