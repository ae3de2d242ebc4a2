use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while loading inputs or running a cell–crop.
///
/// `Config` and `TableLoad` abort the whole run. `MetLoad`, `MissingInput`
/// (at ingest) and `UnexpectedSeasonLength` are caught at the cell or
/// cell–crop boundary by the driver.
#[derive(Error, Debug)]
pub enum CropEtError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("crop table '{path}' could not be loaded: {reason}")]
    TableLoad { path: String, reason: String },
    #[error("crop class {class} references unknown curve number {curve}")]
    UnknownCurve { class: u32, curve: u32 },
    #[error("weather for cell '{cell_id}' could not be loaded: {reason}")]
    MetLoad { cell_id: String, reason: String },
    #[error("cell '{cell_id}' is missing {field} on {date}")]
    MissingInput {
        cell_id: String,
        date: NaiveDate,
        field: String,
    },
    #[error(
        "cell '{cell_id}' crop {class}: season start DOY {doy_start} is too late for a %PL-termination curve"
    )]
    UnexpectedSeasonLength {
        cell_id: String,
        class: u32,
        doy_start: u32,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CropEtError {
    /// Short kind name used in the per-cell failure line.
    pub fn kind(&self) -> &'static str {
        match self {
            CropEtError::Config(_) => "ConfigError",
            CropEtError::TableLoad { .. } | CropEtError::UnknownCurve { .. } => "TableLoadError",
            CropEtError::MetLoad { .. } | CropEtError::Json(_) => "MetLoadError",
            CropEtError::MissingInput { .. } => "MissingInput",
            CropEtError::UnexpectedSeasonLength { .. } => "UnexpectedSeasonLength",
            CropEtError::Io(_) => "IoError",
            CropEtError::TomlDe(_) | CropEtError::TomlSer(_) => "ConfigError",
        }
    }

    /// Whether the run must stop rather than skip the affected cell.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CropEtError::Config(_)
                | CropEtError::TableLoad { .. }
                | CropEtError::UnknownCurve { .. }
                | CropEtError::TomlDe(_)
                | CropEtError::TomlSer(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CropEtError>;

/// Non-error season events. They end or reset a season and are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonEvent {
    FrostTermination,
    HarvestTermination,
    CgddTermination,
    Cutting,
}
