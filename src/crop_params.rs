use serde::{Deserialize, Serialize};
use std::fmt;

/// Kcb curve type. Stored in crop tables as its numeric code 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CurveType {
    /// Normalized cumulative GDD
    Ncgdd,
    /// Percent of time from planting/greenup to effective full cover, all season
    PercentPlEc,
    /// Percent of time to effective full cover, then days after
    PercentPlEcDaysAfter,
    /// Percent of time from planting/greenup to termination
    PercentPlTermination,
}

impl TryFrom<u8> for CurveType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(CurveType::Ncgdd),
            2 => Ok(CurveType::PercentPlEc),
            3 => Ok(CurveType::PercentPlEcDaysAfter),
            4 => Ok(CurveType::PercentPlTermination),
            _ => Err(format!("unknown curve type {}", code)),
        }
    }
}

impl From<CurveType> for u8 {
    fn from(curve_type: CurveType) -> u8 {
        match curve_type {
            CurveType::Ncgdd => 1,
            CurveType::PercentPlEc => 2,
            CurveType::PercentPlEcDaysAfter => 3,
            CurveType::PercentPlTermination => 4,
        }
    }
}

/// Means used to estimate planting or greenup. Stored as its numeric code 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SeasonTrigger {
    /// Cumulative GDD threshold
    Cgdd,
    /// 30-day mean air temperature threshold
    T30,
    /// Fixed calendar date
    Date,
    /// In season every day
    AlwaysOn,
}

impl TryFrom<u8> for SeasonTrigger {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(SeasonTrigger::Cgdd),
            2 => Ok(SeasonTrigger::T30),
            3 => Ok(SeasonTrigger::Date),
            4 => Ok(SeasonTrigger::AlwaysOn),
            _ => Err(format!("unknown season trigger flag {}", code)),
        }
    }
}

impl From<SeasonTrigger> for u8 {
    fn from(trigger: SeasonTrigger) -> u8 {
        match trigger {
            SeasonTrigger::Cgdd => 1,
            SeasonTrigger::T30 => 2,
            SeasonTrigger::Date => 3,
            SeasonTrigger::AlwaysOn => 4,
        }
    }
}

/// CO2 response family, assigned at load time from the configured crop lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Co2Family {
    #[default]
    None,
    Grass,
    Tree,
    C4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinterCoverKind {
    BareSoil,
    Mulch,
    DormantTurf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenWaterKind {
    Shallow,
    DeepLake,
    StockPond,
}

/// Behavioral family of a crop class. The class number itself is kept only as
/// the identifier used in tables and output file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropKind {
    AnnualCrop,
    AlfalfaPeak,
    AlfalfaDairyHay,
    AlfalfaBeefHay,
    WinterCover(WinterCoverKind),
    OpenWater(OpenWaterKind),
    CheatGrass,
}

pub const ALFALFA_FIRST_CYCLE: &str = "alfalfa 1st cycle";

impl CropKind {
    /// Classifies a crop by class number and curve name.
    ///
    /// Classes above 3 whose curve is the alfalfa first-cycle curve behave as
    /// beef hay (multi-cycle, beef cutting count).
    pub fn from_class(class_number: u32, curve_name: &str) -> CropKind {
        match class_number {
            1 => CropKind::AlfalfaPeak,
            2 => CropKind::AlfalfaDairyHay,
            3 => CropKind::AlfalfaBeefHay,
            44 => CropKind::WinterCover(WinterCoverKind::BareSoil),
            45 => CropKind::WinterCover(WinterCoverKind::Mulch),
            46 => CropKind::WinterCover(WinterCoverKind::DormantTurf),
            47 => CropKind::CheatGrass,
            55 => CropKind::OpenWater(OpenWaterKind::Shallow),
            56 => CropKind::OpenWater(OpenWaterKind::DeepLake),
            57 => CropKind::OpenWater(OpenWaterKind::StockPond),
            _ if curve_name.trim().eq_ignore_ascii_case(ALFALFA_FIRST_CYCLE) => CropKind::AlfalfaBeefHay,
            _ => CropKind::AnnualCrop,
        }
    }

    /// Any alfalfa variant; these receive the autumn cold-shock discount.
    pub fn is_alfalfa(self) -> bool {
        matches!(
            self,
            CropKind::AlfalfaPeak | CropKind::AlfalfaDairyHay | CropKind::AlfalfaBeefHay
        )
    }

    /// Alfalfa that runs several cutting cycles per season. Peak alfalfa
    /// (class 1) only does so when `crop_one_flag` is set.
    pub fn is_multi_cycle(self, crop_one_flag: bool) -> bool {
        match self {
            CropKind::AlfalfaPeak => crop_one_flag,
            CropKind::AlfalfaDairyHay | CropKind::AlfalfaBeefHay => true,
            _ => false,
        }
    }

    pub fn is_winter_cover(self) -> bool {
        matches!(self, CropKind::WinterCover(_))
    }

    pub fn is_open_water(self) -> bool {
        matches!(self, CropKind::OpenWater(_))
    }
}

fn default_gdd_trigger_doy() -> u32 {
    1
}

fn default_gdd_max_c() -> f64 {
    30.0
}

/// Phenological constants of one crop class. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropParameters {
    pub class_number: u32,
    pub name: String,
    pub curve_number: u32,
    pub curve_name: String,
    pub curve_type: CurveType,
    #[serde(rename = "flag_for_means_to_estimate_pl_or_gu")]
    pub season_trigger: SeasonTrigger,
    pub t30_for_pl_or_gu_or_cgdd: f64,
    pub date_of_pl_or_gu: f64,
    pub cgdd_for_efc: f64,
    pub cgdd_for_termination: f64,
    pub time_for_efc: f64,    // days
    pub time_for_harvest: f64, // days or percent; negative runs to frost
    pub killing_frost_temperature: f64,
    #[serde(default = "default_gdd_trigger_doy")]
    pub gdd_trigger_doy: u32,
    #[serde(default)]
    pub gdd_base_c: f64,
    #[serde(default = "default_gdd_max_c")]
    pub gdd_max_c: f64,
    pub mad_initial: f64,
    pub mad_mid: f64,
    pub height_min: f64,
    pub height_max: f64,
    #[serde(default)]
    pub cutting_crop: bool,
    #[serde(default)]
    pub co2_family: Co2Family,
}

impl CropParameters {
    pub fn kind(&self) -> CropKind {
        CropKind::from_class(self.class_number, &self.curve_name)
    }

    /// Curve rows this crop needs from the coefficient table.
    pub fn required_curves(&self) -> Vec<u32> {
        if self.kind().is_alfalfa() {
            vec![self.curve_number, self.curve_number + 1, self.curve_number + 2]
        } else {
            vec![self.curve_number]
        }
    }
}

impl fmt::Display for CropParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.class_number, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_class_numbers() {
        assert_eq!(CropKind::from_class(1, "Alfalfa 1st cycle"), CropKind::AlfalfaPeak);
        assert_eq!(CropKind::from_class(2, ""), CropKind::AlfalfaDairyHay);
        assert_eq!(CropKind::from_class(3, ""), CropKind::AlfalfaBeefHay);
        assert_eq!(
            CropKind::from_class(45, "Mulch"),
            CropKind::WinterCover(WinterCoverKind::Mulch)
        );
        assert_eq!(
            CropKind::from_class(56, "Deep lake"),
            CropKind::OpenWater(OpenWaterKind::DeepLake)
        );
        assert_eq!(CropKind::from_class(47, "Cheat grass"), CropKind::CheatGrass);
        assert_eq!(CropKind::from_class(7, "Field corn"), CropKind::AnnualCrop);
    }

    #[test]
    // Should treat any class using the alfalfa first-cycle curve as multi-cycle alfalfa
    fn test_alfalfa_curve_name_selects_alfalfa() {
        let kind = CropKind::from_class(31, "ALFALFA 1st Cycle ");
        assert_eq!(kind, CropKind::AlfalfaBeefHay);
        assert!(kind.is_multi_cycle(false));
    }

    #[test]
    fn test_peak_alfalfa_multi_cycle_only_with_flag() {
        assert!(!CropKind::AlfalfaPeak.is_multi_cycle(false));
        assert!(CropKind::AlfalfaPeak.is_multi_cycle(true));
        assert!(CropKind::AlfalfaPeak.is_alfalfa());
    }

    #[test]
    fn test_numeric_codes() {
        assert_eq!(CurveType::try_from(3u8), Ok(CurveType::PercentPlEcDaysAfter));
        assert!(CurveType::try_from(5u8).is_err());
        assert_eq!(u8::from(SeasonTrigger::AlwaysOn), 4);
        assert!(SeasonTrigger::try_from(0u8).is_err());
    }
}
