use crate::scope::ScopeDescriptor;
use crate::types::{
    AggregateResult, GroupSummary, Overview, ProvinceRollup, ProvincialStat, StrongEntry,
    ThemeSelection, UnifiedRecord,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Aggregate the records of `model` that fall inside `scope`.
///
/// Theme and PDI averages skip missing values instead of counting them as
/// zero. The composite is a mean of per-record means over `theme_keys`.
pub fn aggregate(
    model: &[UnifiedRecord],
    scope: &ScopeDescriptor,
    theme_keys: &[String],
    threshold: f64,
) -> AggregateResult {
    let included = scope.apply(model);
    aggregate_records(&included, theme_keys, threshold)
}

/// Same as `aggregate` over records that are already filtered.
pub fn aggregate_records(
    records: &[&UnifiedRecord],
    theme_keys: &[String],
    threshold: f64,
) -> AggregateResult {
    let mut theme_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    let (mut pdi_sum, mut pdi_count) = (0.0, 0usize);
    let (mut composite_sum, mut composite_count) = (0.0, 0usize);
    let mut high = 0usize;
    let mut strong = Vec::new();

    for r in records {
        if let Some(p) = r.pdi {
            pdi_sum += p;
            pdi_count += 1;
            if p >= threshold {
                high += 1;
            }
        }
        for key in theme_keys {
            if let Some(v) = r.theme(key) {
                let e = theme_sums.entry(key.clone()).or_insert((0.0, 0));
                e.0 += v;
                e.1 += 1;
            }
        }
        if let Some(c) = r.composite(theme_keys) {
            composite_sum += c;
            composite_count += 1;
        }
        let themes = r.strong_themes(theme_keys, threshold);
        if !themes.is_empty() {
            strong.push(StrongEntry {
                muni_code: r.muni_code.clone(),
                themes,
            });
        }
    }

    let mut out = AggregateResult {
        count: records.len(),
        pdi_count,
        avg_pdi: mean(pdi_sum, pdi_count),
        high_complexity_count: high,
        composite_average: mean(composite_sum, composite_count),
        composite_count,
        strong_count: strong.len(),
        strong,
        ..AggregateResult::default()
    };
    for (key, (sum, n)) in theme_sums {
        out.theme_averages.insert(key.clone(), mean(sum, n));
        out.theme_counts.insert(key, n);
    }
    out
}

fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

// Running totals for one province or district.
#[derive(Default)]
struct GroupAcc {
    code: String,
    name: String,
    parent_code: String,
    count: usize,
    pdi_sum: f64,
    pdi_count: usize,
    theme_sum: f64,
    theme_count: usize,
    high: usize,
    strong: usize,
    strong_themes: BTreeSet<String>,
}

impl GroupAcc {
    fn new(code: &str, name: &str, parent_code: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            parent_code: parent_code.to_string(),
            ..Self::default()
        }
    }

    fn add(
        &mut self,
        r: &UnifiedRecord,
        selection: &ThemeSelection,
        keys: &[String],
        threshold: f64,
    ) {
        self.count += 1;
        if let Some(p) = r.pdi {
            self.pdi_sum += p;
            self.pdi_count += 1;
            if p >= threshold {
                self.high += 1;
            }
        }
        if let Some(v) = selection.value(r, keys) {
            self.theme_sum += v;
            self.theme_count += 1;
        }
        let strong = selection.strong_themes(r, keys, threshold);
        if !strong.is_empty() {
            self.strong += 1;
            self.strong_themes.extend(strong);
        }
    }

    fn finish(self, keys: &[String]) -> GroupSummary {
        // report strong theme names in theme-key order
        let mut strong_themes: Vec<String> = keys
            .iter()
            .filter(|k| self.strong_themes.contains(*k))
            .cloned()
            .collect();
        strong_themes.extend(
            self.strong_themes
                .iter()
                .filter(|t| !keys.contains(t))
                .cloned(),
        );
        GroupSummary {
            code: self.code,
            name: self.name,
            parent_code: self.parent_code,
            count: self.count,
            avg_pdi: mean(self.pdi_sum, self.pdi_count),
            pdi_count: self.pdi_count,
            avg_theme: mean(self.theme_sum, self.theme_count),
            theme_count: self.theme_count,
            high_complexity_count: self.high,
            strong_count: self.strong,
            strong_themes,
        }
    }
}

// Keeps groups in first-appearance order.
struct Grouper {
    index: HashMap<String, usize>,
    groups: Vec<GroupAcc>,
}

impl Grouper {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn entry(&mut self, code: &str, name: &str, parent_code: &str) -> &mut GroupAcc {
        let idx = match self.index.get(code) {
            Some(&i) => i,
            None => {
                self.groups.push(GroupAcc::new(code, name, parent_code));
                self.index.insert(code.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[idx];
        if group.name.is_empty() && !name.is_empty() {
            group.name = name.to_string();
        }
        group
    }
}

/// Province summaries with their districts, computed over the records in
/// `scope` only.
///
/// Provinces keep first-appearance order; districts inside a province are
/// sorted by average theme value, highest first. Records without a province
/// code are left out, as are records without a district code from the
/// district lists.
pub fn provincial_rollup(
    model: &[UnifiedRecord],
    scope: &ScopeDescriptor,
    selection: &ThemeSelection,
    theme_keys: &[String],
    threshold: f64,
) -> Vec<ProvinceRollup> {
    let included = scope.apply(model);
    let mut provinces = Grouper::new();
    let mut districts: HashMap<String, Grouper> = HashMap::new();

    for r in included {
        if r.prov_code.is_empty() {
            continue;
        }
        provinces
            .entry(&r.prov_code, &r.prov_name, "")
            .add(r, selection, theme_keys, threshold);
        if r.dist_code.is_empty() {
            continue;
        }
        districts
            .entry(r.prov_code.clone())
            .or_insert_with(Grouper::new)
            .entry(&r.dist_code, &r.dist_name, &r.prov_code)
            .add(r, selection, theme_keys, threshold);
    }

    provinces
        .groups
        .into_iter()
        .map(|acc| {
            let mut dists: Vec<GroupSummary> = districts
                .remove(&acc.code)
                .map(|g| g.groups)
                .unwrap_or_default()
                .into_iter()
                .map(|d| d.finish(theme_keys))
                .collect();
            dists.sort_by(|a, b| {
                b.avg_theme
                    .partial_cmp(&a.avg_theme)
                    .unwrap_or(Ordering::Equal)
            });
            ProvinceRollup {
                summary: acc.finish(theme_keys),
                districts: dists,
            }
        })
        .collect()
}

/// District summaries of one province, from the same filtered set.
pub fn district_rollup(
    model: &[UnifiedRecord],
    scope: &ScopeDescriptor,
    selection: &ThemeSelection,
    theme_keys: &[String],
    threshold: f64,
    province: &str,
) -> Vec<GroupSummary> {
    let province = province.trim();
    provincial_rollup(model, scope, selection, theme_keys, threshold)
        .into_iter()
        .find(|p| p.summary.code == province)
        .map(|p| p.districts)
        .unwrap_or_default()
}

/// Per-province PDI leaderboard over records that have both a province code
/// and a PDI value, highest average first.
pub fn provincial_stats(model: &[UnifiedRecord], threshold: f64) -> Vec<ProvincialStat> {
    let mut acc: Vec<(String, f64, usize, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for r in model {
        let Some(p) = r.pdi else { continue };
        if r.prov_code.is_empty() {
            continue;
        }
        let i = *index.entry(r.prov_code.as_str()).or_insert_with(|| {
            acc.push((r.prov_code.clone(), 0.0, 0, 0));
            acc.len() - 1
        });
        let e = &mut acc[i];
        e.1 += p;
        e.3 += 1;
        if p >= threshold {
            e.2 += 1;
        }
    }
    let mut stats: Vec<ProvincialStat> = acc
        .into_iter()
        .map(|(prov_code, sum, high, n)| ProvincialStat {
            prov_code,
            avg_pdi: mean(sum, n),
            high_complexity_count: high,
            municipality_count: n,
        })
        .collect();
    stats.sort_by(|a, b| b.avg_pdi.partial_cmp(&a.avg_pdi).unwrap_or(Ordering::Equal));
    stats
}

/// Headline numbers for the landing view.
pub fn overview(
    model: &[UnifiedRecord],
    mapped_municipalities: usize,
    pdi_rows: usize,
    threshold: f64,
) -> Overview {
    Overview {
        mapped_municipalities,
        pdi_rows,
        model_size: model.len(),
        high_complexity_count: model
            .iter()
            .filter(|r| r.pdi.is_some_and(|p| p >= threshold))
            .count(),
        top_province: provincial_stats(model, threshold).into_iter().next(),
    }
}
