use crate::error::{CropEtError, Result};
use crate::refet::{RefEtMethod, RefEtType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn default_crop_one_flag() -> bool {
    true
}

fn default_crop_one_reducer() -> f64 {
    0.9
}

fn default_method() -> RefEtMethod {
    RefEtMethod::Asceg
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub crop_params_path: PathBuf,
    pub crop_coefs_path: PathBuf,
    pub cells_path: PathBuf,
    pub weather_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Reference ET methods: `method` drives the crop coefficients, `eto_method` and `etr_method` only fill the output
/// columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefEtConfig {
    #[serde(default = "default_method")]
    pub method: RefEtMethod,
    #[serde(default)]
    pub eto_method: Option<RefEtMethod>,
    #[serde(default)]
    pub etr_method: Option<RefEtMethod>,
}

impl Default for RefEtConfig {
    fn default() -> Self {
        RefEtConfig {
            method: default_method(),
            eto_method: None,
            etr_method: None,
        }
    }
}

impl RefEtConfig {
    pub fn ref_type(&self) -> RefEtType {
        self.method.ref_type()
    }

    pub fn eto_method(&self) -> RefEtMethod {
        self.eto_method.unwrap_or(RefEtMethod::Asceg)
    }

    pub fn etr_method(&self) -> RefEtMethod {
        self.etr_method.unwrap_or(RefEtMethod::Ascer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropEtConfig {
    #[serde(default = "default_crop_one_flag")]
    pub crop_one_flag: bool,
    #[serde(default = "default_crop_one_reducer")]
    pub crop_one_reducer: f64,
    #[serde(default)]
    pub co2_flag: bool,
    #[serde(default)]
    pub co2_grass_list: Vec<u32>,
    #[serde(default)]
    pub co2_tree_list: Vec<u32>,
    #[serde(default)]
    pub co2_c4_list: Vec<u32>,
    /// Only these crop classes are run when set.
    #[serde(default)]
    pub crop_classes: Option<Vec<u32>>,
    /// Only these cells are run when set.
    #[serde(default)]
    pub cell_ids: Option<Vec<String>>,
}

impl Default for CropEtConfig {
    fn default() -> Self {
        CropEtConfig {
            crop_one_flag: default_crop_one_flag(),
            crop_one_reducer: default_crop_one_reducer(),
            co2_flag: false,
            co2_grass_list: Vec::new(),
            co2_tree_list: Vec::new(),
            co2_c4_list: Vec::new(),
            crop_classes: None,
            cell_ids: None,
        }
    }
}

/// Immutable configuration of one run, shared by reference with every cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub refet: RefEtConfig,
    #[serde(default)]
    pub crop_et: CropEtConfig,
}

/// Command line values merged over the file configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub crop_classes: Option<Vec<u32>>,
    pub cell_ids: Option<Vec<String>>,
}

impl RunConfig {
    /// Reads a TOML configuration file. Relative paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<RunConfig> {
        let text = fs::read_to_string(path).map_err(|e| {
            CropEtError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = RunConfig::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        info!(path = %path.display(), "loaded run configuration");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<RunConfig> {
        toml::from_str(text).map_err(|e| CropEtError::Config(e.to_string()))
    }

    fn resolve_paths(&mut self, base: &Path) {
        let project = &mut self.project;
        for path in [
            &mut project.crop_params_path,
            &mut project.crop_coefs_path,
            &mut project.cells_path,
            &mut project.weather_dir,
            &mut project.output_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if overrides.start_date.is_some() {
            self.project.start_date = overrides.start_date;
        }
        if overrides.end_date.is_some() {
            self.project.end_date = overrides.end_date;
        }
        if overrides.crop_classes.is_some() {
            self.crop_et.crop_classes = overrides.crop_classes;
        }
        if overrides.cell_ids.is_some() {
            self.crop_et.cell_ids = overrides.cell_ids;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.project.start_date, self.project.end_date) {
            if end < start {
                return Err(CropEtError::Config(format!(
                    "end date {end} is before start date {start}"
                )));
            }
        }
        if !(self.crop_et.crop_one_reducer > 0.0) {
            return Err(CropEtError::Config(format!(
                "crop_one_reducer must be positive, got {}",
                self.crop_et.crop_one_reducer
            )));
        }
        if self.refet.eto_method().ref_type() != RefEtType::Eto {
            return Err(CropEtError::Config(format!(
                "eto_method {} is not a grass reference method",
                self.refet.eto_method()
            )));
        }
        if self.refet.etr_method().ref_type() != RefEtType::Etr {
            return Err(CropEtError::Config(format!(
                "etr_method {} is not an alfalfa reference method",
                self.refet.etr_method()
            )));
        }
        if let Some(ids) = &self.crop_et.cell_ids {
            if ids.is_empty() {
                return Err(CropEtError::Config("cell list is empty".to_string()));
            }
        }
        Ok(())
    }

    /// Whether a crop class passes the configured filter.
    pub fn runs_crop(&self, class_number: u32) -> bool {
        match &self.crop_et.crop_classes {
            Some(classes) => classes.contains(&class_number),
            None => true,
        }
    }

    /// Whether a cell passes the configured filter.
    pub fn runs_cell(&self, cell_id: &str) -> bool {
        match &self.crop_et.cell_ids {
            Some(ids) => ids.iter().any(|id| id == cell_id),
            None => true,
        }
    }
}

/// Parses a class list such as `"3,7-9"` into `[3, 7, 8, 9]`.
pub fn parse_class_list(spec: &str) -> Result<Vec<u32>> {
    let mut classes = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let bad = || CropEtError::Config(format!("invalid crop class list entry '{part}'"));
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().map_err(|_| bad())?;
                let hi: u32 = hi.trim().parse().map_err(|_| bad())?;
                if hi < lo {
                    return Err(bad());
                }
                classes.extend(lo..=hi);
            }
            None => classes.push(part.parse().map_err(|_| bad())?),
        }
    }
    classes.sort_unstable();
    classes.dedup();
    Ok(classes)
}

/// Parses a comma separated cell ID list.
pub fn parse_cell_list(spec: &str) -> Vec<String> {
    spec.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
