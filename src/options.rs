// Choices offered by filter bars, and how they narrow each other.
use crate::scope::ScopeDescriptor;
use crate::types::UnifiedRecord;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// One selectable area with its parents. Parent codes are empty at the
/// levels where they do not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaOption {
    pub code: String,
    pub name: String,
    pub prov_code: String,
    pub dist_code: String,
}

impl AreaOption {
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.code
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlicerOptions {
    pub provinces: Vec<AreaOption>,
    pub districts: Vec<AreaOption>,
    pub municipalities: Vec<AreaOption>,
    pub categories: Vec<String>,
}

impl SlicerOptions {
    /// Distinct values present in the model. The first record seen for a code
    /// supplies its name and parents.
    pub fn from_model(model: &[UnifiedRecord]) -> Self {
        let mut seen: [HashSet<&str>; 3] = Default::default();
        let mut out = SlicerOptions::default();
        let mut categories = BTreeSet::new();

        for r in model {
            if !r.prov_code.is_empty() && seen[0].insert(&r.prov_code) {
                out.provinces.push(AreaOption {
                    code: r.prov_code.clone(),
                    name: r.prov_name.clone(),
                    prov_code: String::new(),
                    dist_code: String::new(),
                });
            }
            if !r.dist_code.is_empty() && seen[1].insert(&r.dist_code) {
                out.districts.push(AreaOption {
                    code: r.dist_code.clone(),
                    name: r.dist_name.clone(),
                    prov_code: r.prov_code.clone(),
                    dist_code: String::new(),
                });
            }
            if seen[2].insert(&r.muni_code) {
                out.municipalities.push(AreaOption {
                    code: r.muni_code.clone(),
                    name: r.muni_name.clone(),
                    prov_code: r.prov_code.clone(),
                    dist_code: r.dist_code.clone(),
                });
            }
            if !r.miif_category.is_empty() {
                categories.insert(r.miif_category.clone());
            }
        }

        out.provinces.sort_by(|a, b| a.code.cmp(&b.code));
        out.districts.sort_by(|a, b| a.code.cmp(&b.code));
        out.municipalities.sort_by(|a, b| a.label().cmp(b.label()));
        out.categories = categories.into_iter().collect();
        out
    }

    /// Districts allowed by the selected provinces (all when none selected).
    pub fn districts_for(&self, provinces: &BTreeSet<String>) -> Vec<&AreaOption> {
        self.districts
            .iter()
            .filter(|d| provinces.is_empty() || provinces.contains(&d.prov_code))
            .collect()
    }

    /// Municipalities allowed by the selected provinces and districts.
    pub fn municipalities_for(
        &self,
        provinces: &BTreeSet<String>,
        districts: &BTreeSet<String>,
    ) -> Vec<&AreaOption> {
        self.municipalities
            .iter()
            .filter(|m| provinces.is_empty() || provinces.contains(&m.prov_code))
            .filter(|m| districts.is_empty() || districts.contains(&m.dist_code))
            .collect()
    }

    /// Options left once the filters already in `scope` are applied.
    pub fn cascade(&self, scope: &ScopeDescriptor) -> SlicerOptions {
        SlicerOptions {
            provinces: self.provinces.clone(),
            districts: self.districts_for(&scope.provinces).into_iter().cloned().collect(),
            municipalities: self
                .municipalities_for(&scope.provinces, &scope.districts)
                .into_iter()
                .cloned()
                .collect(),
            categories: self.categories.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::build_unified_model;
    use crate::loader::{parse_table, Table};

    fn options() -> SlicerOptions {
        let dim = parse_table(
            "muni_code;muni_name;prov_code;prov_name;dist_code;miif_category\n\
             M3;Zulu;P2;Two;D3;B3\n\
             M1;Alpha;P1;One;D1;B1\n\
             M2;;P1;One;D2;\n\
             M4;Mike;P2;Two;D3;B3\n",
        );
        let model = build_unified_model(&dim, &Table::empty(), &Table::empty()).records;
        SlicerOptions::from_model(&model)
    }

    #[test]
    fn distinct_and_sorted() {
        let o = options();
        let provs: Vec<&str> = o.provinces.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(provs, vec!["P1", "P2"]);
        assert_eq!(o.provinces[0].name, "One");
        let dists: Vec<&str> = o.districts.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(dists, vec!["D1", "D2", "D3"]);
        // unnamed municipality sorts by its code
        let munis: Vec<&str> = o.municipalities.iter().map(|m| m.label()).collect();
        assert_eq!(munis, vec!["Alpha", "M2", "Mike", "Zulu"]);
        assert_eq!(o.categories, vec!["B1", "B3"]);
    }

    #[test]
    fn districts_narrow_by_province() {
        let o = options();
        let provs: BTreeSet<String> = ["P1".to_string()].into();
        let d: Vec<&str> = o.districts_for(&provs).iter().map(|d| d.code.as_str()).collect();
        assert_eq!(d, vec!["D1", "D2"]);
        assert_eq!(o.districts_for(&BTreeSet::new()).len(), 3);
    }

    #[test]
    fn cascade_applies_province_and_district() {
        let o = options();
        let scope = ScopeDescriptor::filters()
            .with_provinces(["P1", "P2"])
            .with_districts(["D3"]);
        let narrowed = o.cascade(&scope);
        let m: Vec<&str> = narrowed.municipalities.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(m, vec!["M4", "M3"]);
        assert_eq!(narrowed.districts.len(), 3);
        assert_eq!(narrowed.provinces.len(), 2);
    }
}
