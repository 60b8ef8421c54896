// Which slice of the model a query covers.
//
// Two filtering policies coexist and are never mixed:
//
// - `Exclusive`: drill-down and hover selections. The most specific active
//   level wins (municipality > district > province); the others are ignored.
// - `Conjunctive`: filter bars. Every non-empty filter set must match.
//
// A descriptor is a plain value, so any number of them can be live at once.
use crate::types::UnifiedRecord;
use crate::util::normalize_code;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ScopeMode {
    #[default]
    Exclusive,
    Conjunctive,
}

/// Geographic level of a single hover or click selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Province,
    District,
    Municipality,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeDescriptor {
    pub mode: ScopeMode,
    pub provinces: BTreeSet<String>,
    pub districts: BTreeSet<String>,
    pub municipalities: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

impl ScopeDescriptor {
    /// No filter: every record.
    pub fn national() -> Self {
        Self::default()
    }

    /// A single hover/click selection, evaluated exclusively.
    pub fn selection(level: Level, code: &str) -> Self {
        let mut scope = Self::national();
        let code = normalize_code(Some(code));
        match level {
            Level::Province => scope.provinces.insert(code),
            Level::District => scope.districts.insert(code),
            Level::Municipality => scope.municipalities.insert(code),
        };
        scope
    }

    pub fn province(code: &str) -> Self {
        Self::selection(Level::Province, code)
    }

    pub fn district(code: &str) -> Self {
        Self::selection(Level::District, code)
    }

    pub fn municipality(code: &str) -> Self {
        Self::selection(Level::Municipality, code)
    }

    /// Start an empty filter-bar scope (conjunctive).
    pub fn filters() -> Self {
        Self {
            mode: ScopeMode::Conjunctive,
            ..Self::default()
        }
    }

    pub fn with_provinces<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.provinces.extend(normalized(codes));
        self
    }

    pub fn with_districts<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.districts.extend(normalized(codes));
        self
    }

    pub fn with_municipalities<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.municipalities.extend(normalized(codes));
        self
    }

    pub fn with_categories<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories.extend(normalized(codes));
        self
    }

    pub fn includes(&self, record: &UnifiedRecord) -> bool {
        match self.mode {
            ScopeMode::Exclusive => ExclusiveScope.includes(self, record),
            ScopeMode::Conjunctive => ConjunctiveScope.includes(self, record),
        }
    }

    /// Records in scope, keeping model order.
    pub fn apply<'a>(&self, model: &'a [UnifiedRecord]) -> Vec<&'a UnifiedRecord> {
        model.iter().filter(|r| self.includes(r)).collect()
    }

    /// Short human label, e.g. for a subtitle.
    pub fn describe(&self) -> String {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        match self.mode {
            ScopeMode::Exclusive => {
                if !self.municipalities.is_empty() {
                    format!("Municipality: {}", join(&self.municipalities))
                } else if !self.districts.is_empty() {
                    format!("District code: {}", join(&self.districts))
                } else if !self.provinces.is_empty() {
                    format!("Province code: {}", join(&self.provinces))
                } else {
                    "All municipalities nationally".to_string()
                }
            }
            ScopeMode::Conjunctive => {
                let parts: Vec<String> = [
                    ("Provinces", &self.provinces),
                    ("Districts", &self.districts),
                    ("Municipalities", &self.municipalities),
                    ("Categories", &self.categories),
                ]
                .into_iter()
                .filter(|(_, set)| !set.is_empty())
                .map(|(name, set)| format!("{name}: {}", join(set)))
                .collect();
                if parts.is_empty() {
                    "All municipalities nationally".to_string()
                } else {
                    parts.join("; ")
                }
            }
        }
    }
}

fn normalized<I, S>(codes: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| normalize_code(Some(c.as_ref())))
        .filter(|c| !c.is_empty())
}

/// Decides whether a record belongs to a scope.
pub trait ScopeEvaluator {
    fn includes(&self, scope: &ScopeDescriptor, record: &UnifiedRecord) -> bool;
}

/// Most specific selection wins. Category filters do not apply here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusiveScope;

impl ScopeEvaluator for ExclusiveScope {
    fn includes(&self, scope: &ScopeDescriptor, record: &UnifiedRecord) -> bool {
        if !scope.municipalities.is_empty() {
            scope.municipalities.contains(&record.muni_code)
        } else if !scope.districts.is_empty() {
            scope.districts.contains(&record.dist_code)
        } else if !scope.provinces.is_empty() {
            scope.provinces.contains(&record.prov_code)
        } else {
            true
        }
    }
}

/// Every active filter set must contain the record's value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConjunctiveScope;

impl ScopeEvaluator for ConjunctiveScope {
    fn includes(&self, scope: &ScopeDescriptor, record: &UnifiedRecord) -> bool {
        let ok = |set: &BTreeSet<String>, value: &String| set.is_empty() || set.contains(value);
        ok(&scope.provinces, &record.prov_code)
            && ok(&scope.districts, &record.dist_code)
            && ok(&scope.municipalities, &record.muni_code)
            && ok(&scope.categories, &record.miif_category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn rec(code: &str, prov: &str, dist: &str, cat: &str) -> UnifiedRecord {
        UnifiedRecord {
            muni_code: code.to_string(),
            muni_name: String::new(),
            prov_code: prov.to_string(),
            prov_name: String::new(),
            dist_code: dist.to_string(),
            dist_name: String::new(),
            miif_category: cat.to_string(),
            centroid_lat: None,
            centroid_lon: None,
            pdi: None,
            themes: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    fn model() -> Vec<UnifiedRecord> {
        vec![
            rec("M1", "P1", "D1", "B3"),
            rec("M2", "P1", "D2", "B4"),
            rec("M3", "P2", "D3", "B3"),
        ]
    }

    fn codes(records: &[&UnifiedRecord]) -> Vec<String> {
        records.iter().map(|r| r.muni_code.clone()).collect()
    }

    #[test]
    fn national_scope_keeps_everything() {
        let m = model();
        assert_eq!(ScopeDescriptor::national().apply(&m).len(), 3);
    }

    #[test]
    fn exclusive_municipality_overrides_other_levels() {
        let m = model();
        let mut scope = ScopeDescriptor::municipality("M3");
        scope.provinces.insert("P1".to_string());
        scope.districts.insert("D1".to_string());
        assert_eq!(codes(&scope.apply(&m)), vec!["M3"]);
    }

    #[test]
    fn exclusive_district_ignores_province() {
        let m = model();
        let mut scope = ScopeDescriptor::district("D3");
        scope.provinces.insert("P1".to_string());
        assert_eq!(codes(&scope.apply(&m)), vec!["M3"]);
    }

    #[test]
    fn exclusive_ignores_categories() {
        let m = model();
        let scope = ScopeDescriptor::province("P1").with_categories(["B4"]);
        assert_eq!(codes(&scope.apply(&m)), vec!["M1", "M2"]);
    }

    #[test]
    fn conjunctive_requires_every_active_filter() {
        let m = model();
        let scope = ScopeDescriptor::filters()
            .with_provinces(["P1", "P2"])
            .with_categories(["B3"]);
        assert_eq!(codes(&scope.apply(&m)), vec!["M1", "M3"]);

        let none = ScopeDescriptor::filters()
            .with_provinces(["P1"])
            .with_districts(["D3"]);
        assert!(none.apply(&m).is_empty());
    }

    #[test]
    fn codes_are_normalized_on_the_way_in() {
        let m = model();
        let scope = ScopeDescriptor::filters().with_municipalities([" M2 ", ""]);
        assert_eq!(scope.municipalities.len(), 1);
        assert_eq!(codes(&scope.apply(&m)), vec!["M2"]);
    }

    #[test]
    fn evaluators_can_be_used_directly() {
        let m = model();
        let scope = ScopeDescriptor::filters()
            .with_provinces(["P1"])
            .with_districts(["D3"]);
        // the same sets read exclusively pick the district alone
        assert!(ExclusiveScope.includes(&scope, &m[2]));
        assert!(!ConjunctiveScope.includes(&scope, &m[2]));
    }

    #[test]
    fn describe_names_the_active_level() {
        assert_eq!(
            ScopeDescriptor::district("D1").describe(),
            "District code: D1"
        );
        assert_eq!(
            ScopeDescriptor::filters().describe(),
            "All municipalities nationally"
        );
    }
}
