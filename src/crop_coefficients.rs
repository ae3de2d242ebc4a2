use crate::crop_params::{Co2Family, CropParameters, CurveType};
use crate::error::{CropEtError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

// Basal crop coefficient curve sampled at 10% steps of the normalized curve axis. Type 3 curves carry 11 samples up to
// effective full cover followed by samples every 10 days after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropCoefficientCurve {
    pub curve_number: u32,
    pub name: String,
    pub curve_type: CurveType,
    pub values: Vec<f64>,
}

impl CropCoefficientCurve {
    /// Number of valid entries.
    pub fn lentry(&self) -> usize {
        self.values.len()
    }

    /// Sample `i`, holding the last valid value beyond the end of the curve.
    pub fn value(&self, i: usize) -> f64 {
        match self.values.get(i) {
            Some(v) => *v,
            None => self.values.last().copied().unwrap_or(0.0),
        }
    }

    /// Linear interpolation at a fractional sample position (10 positions per unit of normalized time).
    ///
    /// # Parameters
    ///
    /// - `position`: sample position, e.g. `n * 10` for a normalized position `n`. Negative positions return the first sample.
    ///
    /// # Returns
    ///
    /// The interpolated Kcb. Positions at or beyond the last valid entry hold that entry.
    pub fn interpolate(&self, position: f64) -> f64 {
        let position = position.max(0.0);
        let i = position.floor() as usize;
        if i + 1 >= self.lentry() {
            return self.value(self.lentry().saturating_sub(1));
        }
        let frac = position - i as f64;
        self.values[i] + frac * (self.values[i + 1] - self.values[i])
    }

    pub fn first(&self) -> f64 {
        self.value(0)
    }

    pub fn peak(&self) -> f64 {
        self.values.iter().copied().fold(f64::MIN, f64::max)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CropParamsFile {
    crops: Vec<CropParameters>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CropCoefsFile {
    curves: Vec<CropCoefficientCurve>,
}

/// Read-only store of crop parameters keyed by class number and curves keyed by curve number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropCatalog {
    crops: BTreeMap<u32, CropParameters>,
    curves: BTreeMap<u32, CropCoefficientCurve>,
}

impl CropCatalog {
    pub fn new(crops: Vec<CropParameters>, curves: Vec<CropCoefficientCurve>) -> Result<Self> {
        let catalog = CropCatalog {
            crops: crops.into_iter().map(|c| (c.class_number, c)).collect(),
            curves: curves.into_iter().map(|c| (c.curve_number, c)).collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads the crop parameter and coefficient tables from TOML files.
    pub fn load(params_path: &Path, coefs_path: &Path) -> Result<Self> {
        let params_str = fs::read_to_string(params_path).map_err(|e| CropEtError::TableLoad {
            path: params_path.display().to_string(),
            reason: e.to_string(),
        })?;
        let coefs_str = fs::read_to_string(coefs_path).map_err(|e| CropEtError::TableLoad {
            path: coefs_path.display().to_string(),
            reason: e.to_string(),
        })?;
        let catalog = Self::from_toml_strs(&params_str, &coefs_str).map_err(|e| match e {
            CropEtError::TomlDe(err) => CropEtError::TableLoad {
                path: format!("{} / {}", params_path.display(), coefs_path.display()),
                reason: err.to_string(),
            },
            other => other,
        })?;
        info!(
            crops = catalog.crops.len(),
            curves = catalog.curves.len(),
            "loaded crop tables"
        );
        Ok(catalog)
    }

    pub fn from_toml_strs(params: &str, coefs: &str) -> Result<Self> {
        let params: CropParamsFile = toml::from_str(params)?;
        let coefs: CropCoefsFile = toml::from_str(coefs)?;
        Self::new(params.crops, coefs.curves)
    }

    /// Serializes both tables back to TOML, parameters first.
    pub fn to_toml_strs(&self) -> Result<(String, String)> {
        let params = CropParamsFile {
            crops: self.crops.values().cloned().collect(),
        };
        let coefs = CropCoefsFile {
            curves: self.curves.values().cloned().collect(),
        };
        Ok((toml::to_string(&params)?, toml::to_string(&coefs)?))
    }

    pub fn save(&self, params_path: &Path, coefs_path: &Path) -> Result<()> {
        let (params, coefs) = self.to_toml_strs()?;
        fs::write(params_path, params)?;
        fs::write(coefs_path, coefs)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for curve in self.curves.values() {
            if curve.values.is_empty() {
                return Err(CropEtError::TableLoad {
                    path: "crop coefficients".to_string(),
                    reason: format!("curve {} has no values", curve.curve_number),
                });
            }
        }
        for crop in self.crops.values() {
            for curve in crop.required_curves() {
                if !self.curves.contains_key(&curve) {
                    return Err(CropEtError::UnknownCurve {
                        class: crop.class_number,
                        curve,
                    });
                }
            }
        }
        Ok(())
    }

    /// Assigns each crop its CO2 response family from the configured class lists.
    pub fn assign_co2_families(&mut self, grass: &[u32], tree: &[u32], c4: &[u32]) {
        for crop in self.crops.values_mut() {
            crop.co2_family = if grass.contains(&crop.class_number) {
                Co2Family::Grass
            } else if tree.contains(&crop.class_number) {
                Co2Family::Tree
            } else if c4.contains(&crop.class_number) {
                Co2Family::C4
            } else {
                Co2Family::None
            };
        }
    }

    pub fn crop(&self, class_number: u32) -> Option<&CropParameters> {
        self.crops.get(&class_number)
    }

    pub fn curve(&self, curve_number: u32) -> Option<&CropCoefficientCurve> {
        self.curves.get(&curve_number)
    }

    pub fn crops(&self) -> impl Iterator<Item = &CropParameters> {
        self.crops.values()
    }

    pub fn len(&self) -> usize {
        self.crops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop_params::SeasonTrigger;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    fn curve(values: Vec<f64>) -> CropCoefficientCurve {
        CropCoefficientCurve {
            curve_number: 1,
            name: "test".to_string(),
            curve_type: CurveType::Ncgdd,
            values,
        }
    }

    #[test]
    fn test_interpolate_between_samples() {
        let c = curve(vec![0.1, 0.3, 0.5]);
        assert_abs_diff_eq!(c.interpolate(0.0), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(c.interpolate(0.5), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(c.interpolate(1.25), 0.35, epsilon = 1e-12);
    }

    #[test]
    // Should hold the last valid entry beyond lentry
    fn test_interpolate_holds_last_entry() {
        let c = curve(vec![0.1, 0.3, 0.5]);
        assert_abs_diff_eq!(c.interpolate(2.0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(c.interpolate(17.3), 0.5, epsilon = 1e-12);
        assert_eq!(c.value(9), 0.5);
        assert_abs_diff_eq!(c.interpolate(-3.0), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_load_crop_tables() {
        let result = CropCatalog::load(
            &data_dir().join("crop_params.toml"),
            &data_dir().join("crop_coefs.toml"),
        );
        if result.is_err() {
            panic!("Error loading crop tables: {}", result.unwrap_err())
        }
        let catalog = result.unwrap();

        let corn = catalog.crop(7);
        assert!(corn.is_some());
        let corn = corn.unwrap();
        assert_eq!(corn.season_trigger, SeasonTrigger::Cgdd);
        assert_eq!(corn.curve_type, CurveType::Ncgdd);
        assert_eq!(corn.t30_for_pl_or_gu_or_cgdd, 112.0);

        let bare = catalog.crop(44).unwrap();
        assert_eq!(bare.season_trigger, SeasonTrigger::AlwaysOn);
        assert_eq!(catalog.curve(corn.curve_number).unwrap().lentry(), 21);
    }

    #[test]
    // Loading, serializing and reloading yields the same records
    fn test_catalog_toml_round_trip() {
        let catalog = CropCatalog::load(
            &data_dir().join("crop_params.toml"),
            &data_dir().join("crop_coefs.toml"),
        )
        .unwrap();
        let (params, coefs) = catalog.to_toml_strs().unwrap();
        let reloaded = CropCatalog::from_toml_strs(&params, &coefs).unwrap();
        assert_eq!(catalog, reloaded);
    }

    #[test]
    fn test_unknown_curve_rejected() {
        let params = r#"
[[crops]]
class_number = 7
name = "Field corn"
curve_number = 99
curve_name = "Corn"
curve_type = 1
flag_for_means_to_estimate_pl_or_gu = 1
t30_for_pl_or_gu_or_cgdd = 112.0
date_of_pl_or_gu = 0.0
cgdd_for_efc = 800.0
cgdd_for_termination = 1600.0
time_for_efc = 0.0
time_for_harvest = 0.0
killing_frost_temperature = -2.0
mad_initial = 0.5
mad_mid = 0.5
height_min = 0.1
height_max = 2.0
"#;
        let coefs = r#"
[[curves]]
curve_number = 1
name = "other"
curve_type = 1
values = [0.15, 0.2]
"#;
        let err = CropCatalog::from_toml_strs(params, coefs).unwrap_err();
        assert!(matches!(err, CropEtError::UnknownCurve { class: 7, curve: 99 }));
        assert_eq!(err.kind(), "TableLoadError");
    }

    #[test]
    fn test_assign_co2_families() {
        let mut catalog = CropCatalog::load(
            &data_dir().join("crop_params.toml"),
            &data_dir().join("crop_coefs.toml"),
        )
        .unwrap();
        catalog.assign_co2_families(&[2, 3], &[], &[7]);
        assert_eq!(catalog.crop(2).unwrap().co2_family, Co2Family::Grass);
        assert_eq!(catalog.crop(7).unwrap().co2_family, Co2Family::C4);
        assert_eq!(catalog.crop(44).unwrap().co2_family, Co2Family::None);
    }
}
