// Leaderboards and value distributions.
//
// Ranking drops records whose value is missing or not above zero. Zero is a
// legitimate score elsewhere (averages count it) but leaderboards read it as
// "no data"; callers showing rankings should say so.
use crate::scope::ScopeDescriptor;
use crate::types::{
    ComplexityDistribution, Direction, Histogram, RankedEntry, ThemeSelection, UnifiedRecord,
};
use std::cmp::Ordering;

/// Upper bounds of the first four complexity levels; the fifth is open.
pub const COMPLEXITY_BOUNDS: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

pub const COMPLEXITY_LABELS: [&str; 5] =
    ["< 0.2", "0.2 - 0.4", "0.4 - 0.6", "0.6 - 0.8", ">= 0.8"];

/// Top or bottom `limit` municipalities in `scope` by the selection's value.
///
/// Ties keep model order.
pub fn rank(
    model: &[UnifiedRecord],
    scope: &ScopeDescriptor,
    selection: &ThemeSelection,
    theme_keys: &[String],
    direction: Direction,
    limit: usize,
) -> Vec<RankedEntry> {
    let mut scored: Vec<(f64, &UnifiedRecord)> = scope
        .apply(model)
        .into_iter()
        .filter_map(|r| {
            let v = selection.value(r, theme_keys)?;
            (v > 0.0).then_some((v, r))
        })
        .collect();

    scored.sort_by(|a, b| {
        let ord = a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal);
        match direction {
            Direction::Top => ord.reverse(),
            Direction::Bottom => ord,
        }
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(value, r)| RankedEntry {
            muni_code: r.muni_code.clone(),
            muni_name: r.label().to_string(),
            prov_code: r.prov_code.clone(),
            dist_code: r.dist_code.clone(),
            value,
            pdi: r.pdi,
        })
        .collect()
}

/// Equal-width histogram between the observed min and max.
///
/// A zero range divides by one instead, so identical values all land in the
/// first bin. The maximum is folded into the last bin.
pub fn histogram_buckets(values: &[f64], bins: usize) -> Histogram {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if bins == 0 || finite.is_empty() {
        return Histogram {
            min: 0.0,
            max: 0.0,
            counts: vec![0; bins],
        };
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // halved so a span across the whole f64 range stays finite
    let half_range = max / 2.0 - min / 2.0;
    let half_range = if half_range == 0.0 { 0.5 } else { half_range };

    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v / 2.0 - min / 2.0) / half_range) * bins as f64).floor() as usize;
        counts[idx.min(bins - 1)] += 1;
    }
    Histogram { min, max, counts }
}

/// Level index of a PDI value, 0 through 4.
pub fn complexity_level(pdi: f64) -> usize {
    COMPLEXITY_BOUNDS
        .iter()
        .position(|&bound| pdi < bound)
        .unwrap_or(COMPLEXITY_BOUNDS.len())
}

/// PDI spread over the five fixed levels; records without PDI are not counted.
pub fn complexity_levels(
    model: &[UnifiedRecord],
    scope: &ScopeDescriptor,
) -> ComplexityDistribution {
    let mut dist = ComplexityDistribution::default();
    for r in scope.apply(model) {
        if let Some(p) = r.pdi {
            dist.levels[complexity_level(p)] += 1;
            dist.total += 1;
        }
    }
    dist
}

/// 1-based position of `value` among `values` sorted highest first.
///
/// Equal values share the best position. `None` when `value` is not present.
pub fn national_rank(values: &[f64], value: f64) -> Option<usize> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    sorted.iter().position(|v| *v == value).map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::build_unified_model;
    use crate::loader::{parse_table, Table};

    fn model() -> Vec<UnifiedRecord> {
        let dim = parse_table(
            "muni_code;muni_name;prov_code;PDI_MinMax\n\
             M1;One;P1;0.7\nM2;Two;P1;0.5\nM3;Three;P2;0.3\nM4;;P2;0.05\nM5;Five;P2;\n",
        );
        let themes = parse_table(
            "muni_code;Health;Safety\nM1;0.8;0.2\nM2;0.4;\nM3;0.2;0.6\nM4;0;0\nM5;;\n",
        );
        build_unified_model(&dim, &themes, &Table::empty()).records
    }

    fn codes(rows: &[RankedEntry]) -> Vec<&str> {
        rows.iter().map(|r| r.muni_code.as_str()).collect()
    }

    fn keys() -> Vec<String> {
        vec!["Health".to_string(), "Safety".to_string()]
    }

    #[test]
    fn top_one_by_health() {
        let m = model();
        let top = rank(
            &m,
            &ScopeDescriptor::national(),
            &ThemeSelection::single("Health"),
            &keys(),
            Direction::Top,
            1,
        );
        assert_eq!(codes(&top), vec!["M1"]);
        assert_eq!(top[0].muni_name, "One");
        assert_eq!(top[0].pdi, Some(0.7));
    }

    #[test]
    fn zero_is_excluded_both_ways() {
        let m = model();
        let sel = ThemeSelection::single("Health");
        let scope = ScopeDescriptor::national();
        let bottom = rank(&m, &scope, &sel, &keys(), Direction::Bottom, 10);
        assert_eq!(codes(&bottom), vec!["M3", "M2", "M1"]);
        let top = rank(&m, &scope, &sel, &keys(), Direction::Top, 10);
        assert!(!codes(&top).contains(&"M4"));
        assert!(!codes(&top).contains(&"M5"));
    }

    #[test]
    fn all_mode_ranks_by_composite_within_scope() {
        let m = model();
        let top = rank(
            &m,
            &ScopeDescriptor::province("P2"),
            &ThemeSelection::All,
            &keys(),
            Direction::Top,
            10,
        );
        assert_eq!(codes(&top), vec!["M3"]);
        assert!((top[0].value - 0.4).abs() < 1e-9);
    }

    #[test]
    fn histogram_uses_observed_range() {
        let h = histogram_buckets(&[0.0, 0.5, 1.0, 0.25], 4);
        assert_eq!(h.counts, vec![1, 1, 1, 1]);
        assert_eq!((h.min, h.max), (0.0, 1.0));
    }

    #[test]
    fn histogram_identical_values_go_to_first_bin() {
        let h = histogram_buckets(&[0.4; 5], 3);
        assert_eq!(h.counts, vec![5, 0, 0]);
    }

    #[test]
    fn histogram_spans_the_whole_float_range() {
        let h = histogram_buckets(&[f64::MIN, f64::MAX, 0.0], 4);
        assert_eq!(h.counts, vec![1, 0, 1, 1]);
    }

    #[test]
    fn histogram_degenerate_inputs() {
        assert_eq!(histogram_buckets(&[], 3).counts, vec![0, 0, 0]);
        assert!(histogram_buckets(&[1.0], 0).counts.is_empty());
    }

    #[test]
    fn complexity_levels_skip_missing_pdi() {
        let m = model();
        let d = complexity_levels(&m, &ScopeDescriptor::national());
        assert_eq!(d.levels, [1, 1, 1, 1, 0]);
        assert_eq!(d.total, 4);
        assert_eq!(complexity_level(0.8), 4);
        assert_eq!(complexity_level(0.6), 3);
    }

    #[test]
    fn national_rank_is_one_based_from_the_top() {
        let values = [0.2, 0.8, 0.5, 0.8];
        assert_eq!(national_rank(&values, 0.8), Some(1));
        assert_eq!(national_rank(&values, 0.5), Some(3));
        assert_eq!(national_rank(&values, 0.9), None);
    }
}
