// Single-area views: one municipality against the nation, or one slice as a
// comparison series.
use crate::ranking::national_rank;
use crate::scope::ScopeDescriptor;
use crate::types::UnifiedRecord;
use crate::util::{average, normalize_code};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeStanding {
    pub theme: String,
    pub value: Option<f64>,
    pub national_average: Option<f64>,
    /// 1 is the highest value nationally.
    pub national_rank: Option<usize>,
    /// How many municipalities have a value for this theme.
    pub ranked_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityProfile {
    pub record: UnifiedRecord,
    pub themes: Vec<ThemeStanding>,
}

/// Average of one theme over a slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeAverage {
    pub theme: String,
    pub average: Option<f64>,
    pub count: usize,
}

fn defined_values(model: &[UnifiedRecord], key: &str) -> Vec<f64> {
    model.iter().filter_map(|r| r.theme(key)).collect()
}

/// Theme values of one municipality with the national average and rank of
/// each. `None` when the code is not in the model.
pub fn municipality_profile(
    model: &[UnifiedRecord],
    code: &str,
    theme_keys: &[String],
) -> Option<MunicipalityProfile> {
    let code = normalize_code(Some(code));
    let record = model.iter().find(|r| r.muni_code == code)?;

    let themes = theme_keys
        .iter()
        .map(|key| {
            let values = defined_values(model, key);
            let value = record.theme(key);
            ThemeStanding {
                theme: key.clone(),
                value,
                national_average: (!values.is_empty()).then(|| average(&values)),
                national_rank: value.and_then(|v| national_rank(&values, v)),
                ranked_count: values.len(),
            }
        })
        .collect();

    Some(MunicipalityProfile {
        record: record.clone(),
        themes,
    })
}

/// Per-theme averages over the records in `scope`, in key order.
pub fn theme_vector(
    model: &[UnifiedRecord],
    scope: &ScopeDescriptor,
    theme_keys: &[String],
) -> Vec<ThemeAverage> {
    let included = scope.apply(model);
    theme_keys
        .iter()
        .map(|key| {
            let values: Vec<f64> = included.iter().filter_map(|r| r.theme(key)).collect();
            ThemeAverage {
                theme: key.clone(),
                average: (!values.is_empty()).then(|| average(&values)),
                count: values.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::build_unified_model;
    use crate::loader::{parse_table, Table};

    fn model() -> Vec<UnifiedRecord> {
        let dim = parse_table("muni_code;prov_code\nM1;P1\nM2;P1\nM3;P2\n");
        let themes = parse_table("muni_code;Health;Safety\nM1;0.8;\nM2;0.4;0.3\nM3;0.2;0.5\n");
        build_unified_model(&dim, &themes, &Table::empty()).records
    }

    fn keys() -> Vec<String> {
        vec!["Health".to_string(), "Safety".to_string()]
    }

    #[test]
    fn profile_ranks_against_the_nation() {
        let m = model();
        let p = municipality_profile(&m, " M2 ", &keys()).unwrap();
        assert_eq!(p.record.muni_code, "M2");

        let health = &p.themes[0];
        assert_eq!(health.value, Some(0.4));
        assert_eq!(health.national_rank, Some(2));
        assert_eq!(health.ranked_count, 3);
        assert!((health.national_average.unwrap() - 1.4 / 3.0).abs() < 1e-9);

        let safety = &p.themes[1];
        assert_eq!(safety.national_rank, Some(2));
        assert_eq!(safety.ranked_count, 2);
    }

    #[test]
    fn missing_value_has_no_rank() {
        let m = model();
        let p = municipality_profile(&m, "M1", &keys()).unwrap();
        assert_eq!(p.themes[1].value, None);
        assert_eq!(p.themes[1].national_rank, None);
        assert!(municipality_profile(&m, "M9", &keys()).is_none());
    }

    #[test]
    fn theme_vector_averages_the_slice() {
        let m = model();
        let v = theme_vector(&m, &ScopeDescriptor::province("P1"), &keys());
        assert!((v[0].average.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(v[1].average, Some(0.3));
        assert_eq!(v[1].count, 1);

        let none = theme_vector(&m, &ScopeDescriptor::province("P9"), &keys());
        assert!(none.iter().all(|t| t.average.is_none() && t.count == 0));
    }
}
