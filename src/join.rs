// Entity join: municipality dimension ⋈ theme scores ⋈ PDI on `muni_code`.
//
// Precedence for a logical field: the dimension table wins whenever it has
// the column at all; otherwise the first non-empty value from the theme
// table, then the PDI table. The PDI value itself is read from the PDI
// table first, then the theme table, then the dimension table.
use crate::loader::{RawRecord, Table};
use crate::schema::{detect_pdi_column, theme_columns, Field, FieldMap, IDENTITY_FIELDS};
use crate::types::UnifiedRecord;
use crate::util::{normalize_code, numeric_opt, numeric_val};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Output of `build_unified_model`.
#[derive(Debug, Clone, Default)]
pub struct UnifiedModel {
    pub records: Vec<UnifiedRecord>,
    /// Dimension rows dropped for lack of a municipality code.
    pub skipped_rows: usize,
    /// Theme columns found in the theme table, in header order.
    pub theme_columns: Vec<String>,
}

// A source table with its resolved field map.
struct Source<'a> {
    table: &'a Table,
    fields: FieldMap,
}

impl<'a> Source<'a> {
    fn new(table: &'a Table, detect_pdi: bool) -> Self {
        let mut fields = FieldMap::resolve(&table.headers, &IDENTITY_FIELDS);
        if detect_pdi && !fields.has(Field::Pdi) {
            if let Some(col) = detect_pdi_column(table) {
                fields.set(Field::Pdi, col);
            }
        }
        Self { table, fields }
    }

    // Normalized code -> row; a later duplicate overwrites an earlier one.
    fn index_by_code(&self) -> HashMap<String, &'a RawRecord> {
        let mut map = HashMap::new();
        for rec in &self.table.records {
            let code = normalize_code(self.fields.get(rec, Field::MuniCode));
            if !code.is_empty() {
                map.insert(code, rec);
            }
        }
        map
    }
}

/// Join the three tables into one record per coded dimension row.
///
/// Output follows dimension order. Theme and PDI tables may be empty; their
/// fields are then simply absent.
pub fn build_unified_model(dimension: &Table, themes: &Table, pdi: &Table) -> UnifiedModel {
    let dim = Source::new(dimension, false);
    let theme = Source::new(themes, false);
    // only the PDI table gets the numeric-column guess
    let pdi_src = Source::new(pdi, true);

    let theme_by_code = theme.index_by_code();
    let pdi_by_code = pdi_src.index_by_code();
    let theme_cols = theme_columns(&themes.headers);
    let dim_headers: HashSet<&str> = dimension.headers.iter().map(String::as_str).collect();

    let mut records = Vec::with_capacity(dimension.records.len());
    let mut skipped_rows = 0usize;

    for row in &dimension.records {
        let code = normalize_code(dim.fields.get(row, Field::MuniCode));
        if code.is_empty() {
            skipped_rows += 1;
            continue;
        }
        let theme_row = theme_by_code.get(&code).copied();
        let pdi_row = pdi_by_code.get(&code).copied();

        let pick = |field: Field| -> String {
            if dim.fields.has(field) {
                return normalize_code(dim.fields.get(row, field));
            }
            [(&theme, theme_row), (&pdi_src, pdi_row)]
                .into_iter()
                .filter_map(|(src, rec)| src.fields.get(rec?, field))
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
                .unwrap_or("")
                .to_string()
        };

        let pdi_value = [(&pdi_src, pdi_row), (&theme, theme_row), (&dim, Some(row))]
            .into_iter()
            .find_map(|(src, rec)| numeric_opt(src.fields.get(rec?, Field::Pdi)));

        let attributes = merge_attributes(
            dimension,
            row,
            &dim_headers,
            [(themes, theme_row), (pdi, pdi_row)],
        );
        let theme_values: BTreeMap<String, f64> = theme_cols
            .iter()
            .filter_map(|col| {
                let v = attributes.get(col).and_then(|s| numeric_val(s))?;
                Some((col.clone(), v))
            })
            .collect();

        records.push(UnifiedRecord {
            muni_code: code,
            muni_name: pick(Field::MuniName),
            prov_code: pick(Field::ProvCode),
            prov_name: pick(Field::ProvName),
            dist_code: pick(Field::DistCode),
            dist_name: pick(Field::DistName),
            miif_category: pick(Field::MiifCategory),
            centroid_lat: numeric_val(&pick(Field::Latitude)),
            centroid_lon: numeric_val(&pick(Field::Longitude)),
            pdi: pdi_value,
            themes: theme_values,
            attributes,
        });
    }

    debug!(
        dimension_rows = dimension.records.len(),
        joined = records.len(),
        skipped = skipped_rows,
        theme_matches = records.iter().filter(|r| !r.themes.is_empty()).count(),
        "built unified model"
    );

    UnifiedModel {
        records,
        skipped_rows,
        theme_columns: theme_cols,
    }
}

// Raw columns merged by the same precedence as logical fields: a column the
// dimension has is always the dimension's; otherwise the first non-empty.
fn merge_attributes(
    dimension: &Table,
    row: &RawRecord,
    dim_headers: &HashSet<&str>,
    fallbacks: [(&Table, Option<&RawRecord>); 2],
) -> BTreeMap<String, String> {
    let mut attrs: BTreeMap<String, String> = dimension
        .headers
        .iter()
        .filter(|h| !h.is_empty())
        .map(|h| (h.clone(), row.get(h).unwrap_or("").trim().to_string()))
        .collect();

    for (table, rec) in fallbacks {
        let Some(rec) = rec else { continue };
        for h in table.headers.iter().filter(|h| !h.is_empty()) {
            if dim_headers.contains(h.as_str()) {
                continue;
            }
            let value = rec.get(h).unwrap_or("").trim();
            match attrs.get(h) {
                Some(existing) if !existing.is_empty() => {}
                _ => {
                    attrs.insert(h.clone(), value.to_string());
                }
            }
        }
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_table;
    use proptest::prelude::*;

    fn dims() -> Table {
        parse_table(
            "muni_code;muni_name;prov_code;prov_name;dist_code;miif_category\n\
             M1;Alpha;P1;Prov One;D1;B3\n\
             \x20M2 ;Beta;P1;Prov One;D1;B4\n\
             ;Nameless;P2;Prov Two;D2;B3\n\
             M3;;P2;Prov Two;D2;B1\n",
        )
    }

    #[test]
    fn joins_on_trimmed_codes_in_dimension_order() {
        let themes = parse_table("MunicipalityCode,Health,Safety\nM2 ,0.4,\nM1,0.8,0.9\n");
        let pdi = parse_table("MUNICODE;PDI_MinMax\nM1;0.7\nM2;0.5\n");
        let model = build_unified_model(&dims(), &themes, &pdi);

        let codes: Vec<&str> = model.records.iter().map(|r| r.muni_code.as_str()).collect();
        assert_eq!(codes, vec!["M1", "M2", "M3"]);
        assert_eq!(model.skipped_rows, 1);
        assert_eq!(model.theme_columns, vec!["Health", "Safety"]);

        let m2 = &model.records[1];
        assert_eq!(m2.theme("Health"), Some(0.4));
        assert_eq!(m2.theme("Safety"), None);
        assert_eq!(m2.pdi, Some(0.5));
    }

    #[test]
    fn missing_theme_and_pdi_stay_absent() {
        let model = build_unified_model(&dims(), &Table::empty(), &Table::empty());
        assert_eq!(model.records.len(), 3);
        let m3 = &model.records[2];
        assert_eq!(m3.pdi, None);
        assert!(m3.themes.is_empty());
    }

    #[test]
    fn dimension_wins_even_when_empty() {
        let themes = parse_table("muni_code;Municipality;Province;Health\nM3;Gamma;PX;0.2\n");
        let model = build_unified_model(&dims(), &themes, &Table::empty());
        let m3 = &model.records[2];
        // dimension has a name column, so its empty value stands
        assert_eq!(m3.muni_name, "");
        assert_eq!(m3.prov_code, "P2");
        assert_eq!(m3.label(), "M3");
    }

    #[test]
    fn absent_dimension_fields_fall_back_in_order() {
        let dim = parse_table("muni_code\nM1\n");
        let themes = parse_table("muni_code;Municipality;Province;Health\nM1;;PT;0.1\n");
        let pdi = parse_table("muni_code;Municipality;Province;PDI\nM1;FromPdi;PP;0.3\n");
        let model = build_unified_model(&dim, &themes, &pdi);
        let r = &model.records[0];
        // theme name is empty, so the PDI table's value is used
        assert_eq!(r.muni_name, "FromPdi");
        assert_eq!(r.prov_code, "PT");
        assert_eq!(r.pdi, Some(0.3));
        assert_eq!(r.attributes.get("Municipality").map(String::as_str), Some("FromPdi"));
        assert_eq!(r.attributes.get("Province").map(String::as_str), Some("PT"));
    }

    #[test]
    fn duplicate_theme_rows_last_one_wins() {
        let themes = parse_table("muni_code;Health\nM1;0.1\nM1;0.9\n");
        let model = build_unified_model(&dims(), &themes, &Table::empty());
        assert_eq!(model.records[0].theme("Health"), Some(0.9));
    }

    #[test]
    fn pdi_prefers_pdi_table_over_theme_table() {
        let themes = parse_table("muni_code;Health;PDI_MinMax\nM1;0.1;0.2\nM2;0.1;0.25\n");
        let pdi = parse_table("muni_code;PDI_MinMax\nM1;0.9\n");
        let model = build_unified_model(&dims(), &themes, &pdi);
        assert_eq!(model.records[0].pdi, Some(0.9));
        assert_eq!(model.records[1].pdi, Some(0.25));
    }

    #[test]
    fn join_is_repeatable() {
        let themes = parse_table("muni_code;Health\nM1;0.8\n");
        let pdi = parse_table("muni_code;PDI_MinMax\nM1;0.7\n");
        let a = build_unified_model(&dims(), &themes, &pdi);
        let b = build_unified_model(&dims(), &themes, &pdi);
        assert_eq!(a.records, b.records);
    }

    #[test]
    fn bom_and_quoted_lines_still_join() {
        let dim = parse_table("\u{feff}\"muni_code,prov_code\"\n\"M1,P1\"\n\"M2,P1\"\n");
        let model = build_unified_model(&dim, &Table::empty(), &Table::empty());
        assert_eq!(model.records.len(), 2);
        assert_eq!(model.skipped_rows, 0);
    }

    fn dim_row() -> impl Strategy<Value = (String, String, String)> {
        (
            " {0,3}",
            prop_oneof![Just(String::new()), "[A-Z][0-9]{1,4}"],
            " {0,3}",
        )
    }

    proptest! {
        #[test]
        fn joined_codes_are_trimmed_and_non_empty(
            rows in prop::collection::vec(dim_row(), 0..30),
        ) {
            let mut text = String::from("muni_code;prov_code\n");
            for (left, code, right) in &rows {
                text.push_str(&format!("{left}{code}{right};P1\n"));
            }
            let model = build_unified_model(&parse_table(&text), &Table::empty(), &Table::empty());

            let expected: Vec<&str> = rows
                .iter()
                .map(|(_, code, _)| code.as_str())
                .filter(|c| !c.is_empty())
                .collect();
            let codes: Vec<&str> = model.records.iter().map(|r| r.muni_code.as_str()).collect();
            prop_assert_eq!(codes, expected.clone());
            prop_assert!(model
                .records
                .iter()
                .all(|r| !r.muni_code.is_empty() && r.muni_code == r.muni_code.trim()));
            prop_assert_eq!(model.skipped_rows, rows.len() - expected.len());
        }
    }
}
