// Report rows, console previews and file exports for the report binary.
use crate::error::Result;
use crate::ranking::COMPLEXITY_LABELS;
use crate::types::{
    AggregateResult, ComplexityDistribution, LeaderboardRow, LevelRow, Overview, ProvinceRow,
    ProvinceRollup, RankedEntry, SummaryStats,
};
use crate::util::{format_number, format_opt};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Print at most `max_rows` rows as a markdown table.
pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn province_rows(rollup: &[ProvinceRollup]) -> Vec<ProvinceRow> {
    rollup
        .iter()
        .map(|p| {
            let s = &p.summary;
            ProvinceRow {
                province: if s.name.is_empty() {
                    s.code.clone()
                } else {
                    format!("{} ({})", s.name, s.code)
                },
                municipalities: s.count,
                avg_pdi: format_opt((s.pdi_count > 0).then_some(s.avg_pdi), 3),
                avg_theme: format_opt((s.theme_count > 0).then_some(s.avg_theme), 3),
                high_complexity: s.high_complexity_count,
                strong_themes: s.strong_themes.join(", "),
            }
        })
        .collect()
}

pub fn leaderboard_rows(entries: &[RankedEntry]) -> Vec<LeaderboardRow> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, e)| LeaderboardRow {
            rank: idx + 1,
            municipality: e.muni_name.clone(),
            province: e.prov_code.clone(),
            score: format_number(e.value, 3),
            pdi: format_opt(e.pdi, 3),
        })
        .collect()
}

pub fn level_rows(dist: &ComplexityDistribution) -> Vec<LevelRow> {
    COMPLEXITY_LABELS
        .iter()
        .zip(dist.levels)
        .map(|(label, n)| LevelRow {
            level: label.to_string(),
            municipalities: n,
            share: if dist.total == 0 {
                "0.00%".to_string()
            } else {
                format!("{}%", format_number(n as f64 * 100.0 / dist.total as f64, 2))
            },
        })
        .collect()
}

pub fn summary_stats(
    overview: &Overview,
    national: &AggregateResult,
    provinces: usize,
    threshold: f64,
) -> SummaryStats {
    SummaryStats {
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        municipalities: overview.model_size,
        provinces,
        avg_pdi: national.avg_pdi,
        high_complexity_count: overview.high_complexity_count,
        high_threshold: threshold,
        top_province: overview.top_province.as_ref().map(|p| p.prov_code.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroupSummary;

    #[test]
    fn province_rows_render_missing_averages_as_dash() {
        let rollup = vec![ProvinceRollup {
            summary: GroupSummary {
                code: "P1".to_string(),
                name: "North".to_string(),
                count: 2,
                avg_pdi: 0.6,
                pdi_count: 2,
                strong_themes: vec!["Health".to_string(), "Safety".to_string()],
                ..GroupSummary::default()
            },
            districts: Vec::new(),
        }];
        let rows = province_rows(&rollup);
        assert_eq!(rows[0].province, "North (P1)");
        assert_eq!(rows[0].avg_pdi, "0.600");
        assert_eq!(rows[0].avg_theme, "-");
        assert_eq!(rows[0].strong_themes, "Health, Safety");
    }

    #[test]
    fn level_shares_sum_to_total() {
        let dist = ComplexityDistribution {
            levels: [1, 0, 2, 1, 0],
            total: 4,
        };
        let rows = level_rows(&dist);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2].share, "50.00%");
        assert_eq!(rows[4].level, ">= 0.8");
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels.csv");
        let rows = level_rows(&ComplexityDistribution::default());
        write_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Level,Municipalities,Share\n"));
        assert_eq!(text.lines().count(), 6);
    }
}
