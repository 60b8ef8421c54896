use crate::util::numeric_val;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;

/// One municipality after joining the dimension, theme and PDI tables.
///
/// Missing numbers stay `None`; they are never read as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedRecord {
    pub muni_code: String,
    pub muni_name: String,
    pub prov_code: String,
    pub prov_name: String,
    pub dist_code: String,
    pub dist_name: String,
    pub miif_category: String,
    pub centroid_lat: Option<f64>,
    pub centroid_lon: Option<f64>,
    #[serde(rename = "PDI_MinMax")]
    pub pdi: Option<f64>,
    /// Parsed theme scores, only for cells that held a number.
    pub themes: BTreeMap<String, f64>,
    /// Every source column after precedence merging, as text.
    pub attributes: BTreeMap<String, String>,
}

impl UnifiedRecord {
    /// Theme score by key. Keys outside the theme table fall back to the
    /// merged attribute of the same name.
    pub fn theme(&self, key: &str) -> Option<f64> {
        self.themes
            .get(key)
            .copied()
            .or_else(|| self.attributes.get(key).and_then(|v| numeric_val(v)))
    }

    /// Mean over the keys this record has values for; `None` when it has none.
    pub fn composite(&self, keys: &[String]) -> Option<f64> {
        let vals: Vec<f64> = keys.iter().filter_map(|k| self.theme(k)).collect();
        if vals.is_empty() {
            return None;
        }
        Some(vals.iter().sum::<f64>() / vals.len() as f64)
    }

    /// Keys whose individual value reaches `threshold`, in key order.
    pub fn strong_themes(&self, keys: &[String], threshold: f64) -> Vec<String> {
        keys.iter()
            .filter(|k| self.theme(k).is_some_and(|v| v >= threshold))
            .cloned()
            .collect()
    }

    /// Display label: the name, or the code when no name is known.
    pub fn label(&self) -> &str {
        if self.muni_name.is_empty() {
            &self.muni_code
        } else {
            &self.muni_name
        }
    }
}

/// What a theme-driven view looks at: one theme, or all of them at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ThemeSelection {
    Single(String),
    All,
}

impl ThemeSelection {
    pub fn single(key: &str) -> Self {
        ThemeSelection::Single(key.to_string())
    }

    /// The per-record value this selection ranks and averages by.
    pub fn value(&self, record: &UnifiedRecord, keys: &[String]) -> Option<f64> {
        match self {
            ThemeSelection::Single(key) => record.theme(key),
            ThemeSelection::All => record.composite(keys),
        }
    }

    /// Theme names that make a record "strong" under this selection.
    ///
    /// For `All` any single theme at or above the threshold qualifies; the
    /// composite mean is not consulted.
    pub fn strong_themes(
        &self,
        record: &UnifiedRecord,
        keys: &[String],
        threshold: f64,
    ) -> Vec<String> {
        match self {
            ThemeSelection::Single(key) => match record.theme(key) {
                Some(v) if v >= threshold => vec![key.clone()],
                _ => Vec::new(),
            },
            ThemeSelection::All => record.strong_themes(keys, threshold),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ThemeSelection::Single(key) => key,
            ThemeSelection::All => "All themes",
        }
    }
}

/// Aggregate over the records of one scope.
///
/// Averages are 0 when nothing contributed; check the matching count before
/// trusting a zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub count: usize,
    pub pdi_count: usize,
    pub avg_pdi: f64,
    pub high_complexity_count: usize,
    pub theme_averages: BTreeMap<String, f64>,
    pub theme_counts: BTreeMap<String, usize>,
    /// Mean of per-record theme means (records without any theme skipped).
    pub composite_average: f64,
    pub composite_count: usize,
    /// Records with at least one theme at or above the threshold.
    pub strong_count: usize,
    pub strong: Vec<StrongEntry>,
}

/// A record flagged strong, with the themes that qualified it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrongEntry {
    pub muni_code: String,
    pub themes: Vec<String>,
}

/// One row of a province or district rollup under a theme selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    pub code: String,
    pub name: String,
    pub parent_code: String,
    pub count: usize,
    pub avg_pdi: f64,
    pub pdi_count: usize,
    pub avg_theme: f64,
    pub theme_count: usize,
    pub high_complexity_count: usize,
    pub strong_count: usize,
    pub strong_themes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceRollup {
    pub summary: GroupSummary,
    pub districts: Vec<GroupSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub muni_code: String,
    pub muni_name: String,
    pub prov_code: String,
    pub dist_code: String,
    pub value: f64,
    pub pdi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

/// PDI spread over the fixed levels `<0.2`, `<0.4`, `<0.6`, `<0.8`, `>=0.8`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplexityDistribution {
    pub levels: [usize; 5],
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvincialStat {
    pub prov_code: String,
    pub avg_pdi: f64,
    pub high_complexity_count: usize,
    pub municipality_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub mapped_municipalities: usize,
    pub pdi_rows: usize,
    pub model_size: usize,
    pub high_complexity_count: usize,
    pub top_province: Option<ProvincialStat>,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: String,
    pub municipalities: usize,
    pub provinces: usize,
    pub avg_pdi: f64,
    pub high_complexity_count: usize,
    pub high_threshold: f64,
    pub top_province: Option<String>,
}

// ---- rows for the report shell ----

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProvinceRow {
    #[serde(rename = "Province")]
    #[tabled(rename = "Province")]
    pub province: String,
    #[serde(rename = "Municipalities")]
    #[tabled(rename = "Municipalities")]
    pub municipalities: usize,
    #[serde(rename = "AvgPDI")]
    #[tabled(rename = "AvgPDI")]
    pub avg_pdi: String,
    #[serde(rename = "AvgTheme")]
    #[tabled(rename = "AvgTheme")]
    pub avg_theme: String,
    #[serde(rename = "HighComplexity")]
    #[tabled(rename = "HighComplexity")]
    pub high_complexity: usize,
    #[serde(rename = "StrongThemes")]
    #[tabled(rename = "StrongThemes")]
    pub strong_themes: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LeaderboardRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Municipality")]
    #[tabled(rename = "Municipality")]
    pub municipality: String,
    #[serde(rename = "Province")]
    #[tabled(rename = "Province")]
    pub province: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "PDI")]
    #[tabled(rename = "PDI")]
    pub pdi: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LevelRow {
    #[serde(rename = "Level")]
    #[tabled(rename = "Level")]
    pub level: String,
    #[serde(rename = "Municipalities")]
    #[tabled(rename = "Municipalities")]
    pub municipalities: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}
