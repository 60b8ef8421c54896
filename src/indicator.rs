// Indicator dimension and the per-municipality indicator facts.
use crate::loader::Table;
use crate::schema::{Field, FieldMap};
use crate::util::{normalize_code, numeric_opt};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub id: String,
    pub name: String,
    pub theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorFact {
    pub muni_code: String,
    pub indicator_id: String,
    pub value: f64,
}

/// Mean of one indicator over a set of municipalities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorValue {
    pub indicator: Indicator,
    pub value: Option<f64>,
    pub count: usize,
}

/// Indicators in table order. Rows without an id are dropped; a missing name
/// falls back to the id.
pub fn indicators_from_table(table: &Table) -> Vec<Indicator> {
    let fields = FieldMap::resolve(
        &table.headers,
        &[Field::IndicatorId, Field::IndicatorName, Field::IndicatorTheme],
    );
    table
        .records
        .iter()
        .filter_map(|r| {
            let id = normalize_code(fields.get(r, Field::IndicatorId));
            if id.is_empty() {
                return None;
            }
            let name = normalize_code(fields.get(r, Field::IndicatorName));
            Some(Indicator {
                name: if name.is_empty() { id.clone() } else { name },
                theme: normalize_code(fields.get(r, Field::IndicatorTheme)),
                id,
            })
        })
        .collect()
}

/// Fact rows that carry a code, an indicator id and a numeric value.
pub fn facts_from_table(table: &Table) -> Vec<IndicatorFact> {
    let fields = FieldMap::resolve(
        &table.headers,
        &[Field::MuniCode, Field::IndicatorId, Field::FactValue],
    );
    table
        .records
        .iter()
        .filter_map(|r| {
            let muni_code = normalize_code(fields.get(r, Field::MuniCode));
            let indicator_id = normalize_code(fields.get(r, Field::IndicatorId));
            if muni_code.is_empty() || indicator_id.is_empty() {
                return None;
            }
            let value = numeric_opt(fields.get(r, Field::FactValue))?;
            Some(IndicatorFact {
                muni_code,
                indicator_id,
                value,
            })
        })
        .collect()
}

/// Every indicator with its mean over facts of the given municipalities.
/// Indicators without a matching fact keep `value: None`.
pub fn indicator_profile(
    indicators: &[Indicator],
    facts: &[IndicatorFact],
    municipalities: &BTreeSet<&str>,
) -> Vec<IndicatorValue> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for f in facts {
        if !municipalities.contains(f.muni_code.as_str()) {
            continue;
        }
        let e = sums.entry(f.indicator_id.as_str()).or_insert((0.0, 0));
        e.0 += f.value;
        e.1 += 1;
    }
    indicators
        .iter()
        .map(|ind| {
            let (sum, n) = sums.get(ind.id.as_str()).copied().unwrap_or((0.0, 0));
            IndicatorValue {
                indicator: ind.clone(),
                value: (n > 0).then(|| sum / n as f64),
                count: n,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_table;

    #[test]
    fn indicator_dimension_aliases() {
        let t = parse_table("ID;Label;Category\nI1;Clinics;Health\n;Orphan;X\nI2;;Safety\n");
        let ind = indicators_from_table(&t);
        assert_eq!(ind.len(), 2);
        assert_eq!(ind[0].name, "Clinics");
        assert_eq!(ind[0].theme, "Health");
        assert_eq!(ind[1].name, "I2");
    }

    #[test]
    fn facts_need_a_number() {
        let t = parse_table(
            "MunicipalityCode,IndicatorID,ValueParsed\nM1,I1,\"1,5\"\nM1,I2,n/a\n,I1,3\n",
        );
        let facts = facts_from_table(&t);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, 1.5);
    }

    #[test]
    fn profile_means_over_selected_municipalities() {
        let indicators = indicators_from_table(&parse_table(
            "IndicatorID;IndicatorName;Theme\nI1;Clinics;Health\nI2;Crime;Safety\n",
        ));
        let facts = facts_from_table(&parse_table(
            "muni_code;IndicatorID;Value\nM1;I1;2\nM2;I1;4\nM3;I1;100\nM3;I2;7\n",
        ));
        let scope: BTreeSet<&str> = ["M1", "M2"].into();
        let p = indicator_profile(&indicators, &facts, &scope);
        assert_eq!(p[0].value, Some(3.0));
        assert_eq!(p[0].count, 2);
        assert_eq!(p[1].value, None);
    }
}
