// Logical fields and their spellings across source tables.
//
// Each source spells the same concept differently (`muni_code`,
// `MunicipalityCode`, `MUNICODE`, ...). A `FieldMap` is resolved once per
// table from its header; rows are then read through it without re-probing.
use crate::loader::{RawRecord, Table};
use crate::util::numeric_val;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    MuniCode,
    MuniName,
    ProvCode,
    ProvName,
    DistCode,
    DistName,
    MiifCategory,
    Latitude,
    Longitude,
    Pdi,
    IndicatorId,
    IndicatorName,
    IndicatorTheme,
    FactValue,
}

impl Field {
    /// Candidate header names, most preferred first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::MuniCode => &["muni_code", "MunicipalityCode", "MUNICODE", "MunicipalCode"],
            Field::MuniName => &["muni_name", "Municipality", "MunicipalityName"],
            Field::ProvCode => &["prov_code", "Province", "ProvinceCode", "ProvCode"],
            Field::ProvName => &["prov_name", "ProvinceName", "ProvName"],
            Field::DistCode => &["dist_code", "DistrictCode", "District"],
            Field::DistName => &["dist_name", "DistrictName"],
            Field::MiifCategory => &["miif_category", "MIIF_CATEGORY", "MIIF_Category", "miif"],
            Field::Latitude => &["centroid_lat", "centroidLat", "Latitude", "lat"],
            Field::Longitude => &["centroid_lon", "centroidLon", "Longitude", "lon"],
            Field::Pdi => &[
                "PDI_MinMax",
                "PDI_MINMAX",
                "PDI_Min_Max",
                "PDI",
                "PDI_VALUE",
                "PDI_VALUE_MINMAX",
                "PDI_SCORE",
            ],
            Field::IndicatorId => &["IndicatorID", "IndicatorId", "INDICATOR_ID", "ID", "Id", "id"],
            Field::IndicatorName => &["IndicatorName", "Name", "Label"],
            Field::IndicatorTheme => &["Theme", "Category"],
            Field::FactValue => &["ValueParsed", "ValueRaw", "Value", "VALUE"],
        }
    }
}

/// Fields describing where a municipality sits, plus its PDI.
pub const IDENTITY_FIELDS: [Field; 10] = [
    Field::MuniCode,
    Field::MuniName,
    Field::ProvCode,
    Field::ProvName,
    Field::DistCode,
    Field::DistName,
    Field::MiifCategory,
    Field::Latitude,
    Field::Longitude,
    Field::Pdi,
];

/// Logical field -> actual header, fixed for one table.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    columns: HashMap<Field, String>,
}

impl FieldMap {
    /// Resolve `fields` against `headers`: exact spelling wins over a
    /// case-insensitive match, and earlier aliases win over later ones.
    pub fn resolve(headers: &[String], fields: &[Field]) -> Self {
        let mut columns = HashMap::new();
        for &field in fields {
            if let Some(col) = find_column(headers, field.aliases()) {
                columns.insert(field, col);
            }
        }
        Self { columns }
    }

    pub fn column(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Point a field at a column found some other way (see `detect_pdi_column`).
    pub fn set(&mut self, field: Field, column: String) {
        self.columns.insert(field, column);
    }

    pub fn get<'a>(&self, record: &'a RawRecord, field: Field) -> Option<&'a str> {
        record.get(self.column(field)?)
    }
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        if let Some(h) = headers.iter().find(|h| h.as_str() == *alias) {
            return Some(h.clone());
        }
    }
    for alias in aliases {
        if let Some(h) = headers.iter().find(|h| h.eq_ignore_ascii_case(alias)) {
            return Some(h.clone());
        }
    }
    None
}

/// True for code, name, hierarchy, coordinate and PDI columns.
pub fn is_identity_column(header: &str) -> bool {
    IDENTITY_FIELDS
        .iter()
        .flat_map(|f| f.aliases().iter())
        .any(|alias| header.eq_ignore_ascii_case(alias))
}

/// Theme score columns of a table: everything that is not an identity column.
pub fn theme_columns(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .filter(|h| !h.is_empty() && !is_identity_column(h))
        .cloned()
        .collect()
}

const NON_PDI_HINTS: [&str; 7] = [
    "municipality",
    "province",
    "district",
    "latitude",
    "longitude",
    "lat",
    "lon",
];

/// Find the PDI column of a table.
///
/// Alias probing first. Failing that, the column with the most numeric cells
/// (skipping identity-looking names) if at least `max(3, rows / 10)` parse,
/// and finally any header mentioning both "min" and "max".
pub fn detect_pdi_column(table: &Table) -> Option<String> {
    if let Some(col) = find_column(&table.headers, Field::Pdi.aliases()) {
        return Some(col);
    }

    let mut best: Option<(usize, &String)> = None;
    for header in &table.headers {
        let lower = header.to_ascii_lowercase();
        if lower.contains("code") || NON_PDI_HINTS.iter().any(|hint| lower.contains(hint)) {
            continue;
        }
        let count = table
            .records
            .iter()
            .filter(|r| r.get(header).and_then(numeric_val).is_some())
            .count();
        if best.map_or(true, |(c, _)| count > c) {
            best = Some((count, header));
        }
    }
    let min_count = std::cmp::max(3, table.records.len() / 10);
    if let Some((count, header)) = best {
        if count > 0 && count >= min_count {
            return Some(header.clone());
        }
    }

    table
        .headers
        .iter()
        .find(|h| {
            let lower = h.to_ascii_lowercase();
            lower.contains("min") && lower.contains("max")
        })
        .cloned()
}
