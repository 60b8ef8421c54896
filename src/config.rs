// Runtime settings: where the data lives and the dashboard constants.
use crate::error::{PdiError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_THEMES: [&str; 7] = [
    "Demographics",
    "Finance",
    "Governance",
    "Health",
    "Infrastructure",
    "Poverty",
    "Safety",
];

/// Resource file names, relative to `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub municipalities: String,
    pub indicators: String,
    pub theme_scores: String,
    pub pdi: String,
    /// Large fact table, only read when indicator details are requested.
    pub indicator_facts: String,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            municipalities: "DimMunicipality_clean.csv".to_string(),
            indicators: "DimIndicator_clean_fixed_semicolon.csv".to_string(),
            theme_scores: "theme_scores_municipality_minmax_dummy.csv".to_string(),
            pdi: "pdi_municipality_minmax_dummy.csv".to_string(),
            indicator_facts: "FactLong_2024_dummy_populated_compact_semicolon.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub resources: Resources,
    /// PDI at or above this is "high complexity"; theme values at or above
    /// it are "strong".
    pub high_threshold: f64,
    pub theme_keys: Vec<String>,
    pub leaderboard_limit: usize,
    pub histogram_bins: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
            resources: Resources::default(),
            high_threshold: 0.6,
            theme_keys: DEFAULT_THEMES.iter().map(|s| s.to_string()).collect(),
            leaderboard_limit: 10,
            histogram_bins: 20,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read a JSON config. Missing keys take their defaults; a missing file
    /// gives the default config.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(PdiError::Config {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&text).map_err(|e| PdiError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_constants() {
        let c = Config::default();
        assert_eq!(c.high_threshold, 0.6);
        assert_eq!(c.leaderboard_limit, 10);
        assert_eq!(c.theme_keys.len(), 7);
        assert_eq!(c.theme_keys[3], "Health");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdi.json");
        std::fs::write(
            &path,
            r#"{"data_dir": "/srv/pdi", "high_threshold": 0.75, "resources": {"pdi": "p.csv"}}"#,
        )
        .unwrap();
        let c = Config::load(&path).unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/srv/pdi"));
        assert_eq!(c.high_threshold, 0.75);
        assert_eq!(c.resources.pdi, "p.csv");
        assert_eq!(c.resources.municipalities, "DimMunicipality_clean.csv");
        assert_eq!(c.histogram_bins, 20);
    }

    #[test]
    fn missing_file_is_default_but_bad_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let c = Config::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(c, Config::default());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            Config::load(&bad),
            Err(PdiError::ConfigParse { .. })
        ));
    }
}
