// The data access object every view queries.
//
// A `DataStore` is built once with a fetch capability and a config. `load`
// pulls the four startup tables in parallel, joins them, and freezes the
// result. A failed load is final for the store's lifetime.
use crate::config::Config;
use crate::error::{PdiError, Result};
use crate::indicator::{facts_from_table, indicator_profile, indicators_from_table};
use crate::indicator::{Indicator, IndicatorFact, IndicatorValue};
use crate::join::{build_unified_model, UnifiedModel};
use crate::loader::{parse_table, Table};
use crate::options::SlicerOptions;
use crate::profile::{municipality_profile, theme_vector, MunicipalityProfile, ThemeAverage};
use crate::ranking;
use crate::reports;
use crate::scope::ScopeDescriptor;
use crate::source::ResourceSource;
use crate::types::{
    AggregateResult, ComplexityDistribution, Direction, GroupSummary, Histogram, Overview,
    ProvinceRollup, ProvincialStat, RankedEntry, ThemeSelection, UnifiedRecord,
};
use once_cell::sync::OnceCell;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Everything produced by a successful startup load. Immutable.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub model: UnifiedModel,
    pub indicators: Vec<Indicator>,
    /// Rows in the municipality dimension, coded or not.
    pub mapped_municipalities: usize,
    pub pdi_rows: usize,
}

pub struct DataStore<S: ResourceSource> {
    source: S,
    config: Config,
    dataset: OnceCell<Dataset>,
    failure: OnceCell<String>,
    facts: OnceCell<Vec<IndicatorFact>>,
}

impl<S: ResourceSource> DataStore<S> {
    pub fn new(source: S, config: Config) -> Self {
        Self {
            source,
            config,
            dataset: OnceCell::new(),
            failure: OnceCell::new(),
            facts: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load and join the startup tables, once.
    ///
    /// Later calls return the same dataset. After a failure every call
    /// (and every query) returns `LoadFailed`.
    pub fn load(&self) -> Result<&Dataset> {
        if let Some(msg) = self.failure.get() {
            return Err(PdiError::LoadFailed(msg.clone()));
        }
        self.dataset.get_or_try_init(|| self.fetch_all()).map_err(|e| {
            let _ = self.failure.set(e.to_string());
            e
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.get().is_some()
    }

    fn fetch_table(&self, path: &str) -> Result<Table> {
        let text = self.source.fetch(path)?;
        let table = parse_table(&text);
        debug!(path, rows = table.len(), state = ?table.state, "parsed resource");
        Ok(table)
    }

    fn fetch_all(&self) -> Result<Dataset> {
        let res = &self.config.resources;
        let paths = [
            res.municipalities.as_str(),
            res.indicators.as_str(),
            res.theme_scores.as_str(),
            res.pdi.as_str(),
        ];

        // all four fetches finish before anything is joined
        let results: Vec<Result<Table>> = std::thread::scope(|s| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| s.spawn(move || self.fetch_table(path)))
                .collect();
            handles
                .into_iter()
                .zip(paths)
                .map(|(h, path)| {
                    h.join().unwrap_or_else(|_| {
                        Err(PdiError::LoadFailed(format!("fetch of {path} panicked")))
                    })
                })
                .collect()
        });

        let mut tables = Vec::with_capacity(4);
        for r in results {
            tables.push(r?);
        }
        let [dimension, indicators, themes, pdi]: [Table; 4] = tables
            .try_into()
            .map_err(|_| PdiError::LoadFailed("incomplete fetch results".to_string()))?;

        let model = build_unified_model(&dimension, &themes, &pdi);
        let indicators = indicators_from_table(&indicators);
        info!(
            municipalities = dimension.len(),
            joined = model.records.len(),
            skipped = model.skipped_rows,
            theme_columns = model.theme_columns.len(),
            pdi_rows = pdi.len(),
            indicators = indicators.len(),
            "dataset loaded"
        );

        Ok(Dataset {
            mapped_municipalities: dimension.len(),
            pdi_rows: pdi.len(),
            model,
            indicators,
        })
    }

    /// The loaded dataset, or why there is none.
    pub fn dataset(&self) -> Result<&Dataset> {
        if let Some(ds) = self.dataset.get() {
            return Ok(ds);
        }
        match self.failure.get() {
            Some(msg) => Err(PdiError::LoadFailed(msg.clone())),
            None => Err(PdiError::NotLoaded),
        }
    }

    pub fn unified_model(&self) -> Result<&[UnifiedRecord]> {
        Ok(&self.dataset()?.model.records)
    }

    /// Theme columns found in the theme table.
    pub fn theme_columns(&self) -> Result<&[String]> {
        Ok(&self.dataset()?.model.theme_columns)
    }

    // Views bring their own theme set; `None` means the configured one.
    fn keys_or_default<'a>(&'a self, theme_keys: Option<&'a [String]>) -> &'a [String] {
        theme_keys.unwrap_or(&self.config.theme_keys)
    }

    pub fn aggregate(
        &self,
        scope: &ScopeDescriptor,
        theme_keys: &[String],
        threshold: f64,
    ) -> Result<AggregateResult> {
        Ok(reports::aggregate(
            self.unified_model()?,
            scope,
            theme_keys,
            threshold,
        ))
    }

    pub fn rank(
        &self,
        scope: &ScopeDescriptor,
        selection: &ThemeSelection,
        theme_keys: Option<&[String]>,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<RankedEntry>> {
        Ok(ranking::rank(
            self.unified_model()?,
            scope,
            selection,
            self.keys_or_default(theme_keys),
            direction,
            limit,
        ))
    }

    /// Pure; does not need a loaded dataset.
    pub fn histogram_buckets(&self, values: &[f64], bins: usize) -> Histogram {
        ranking::histogram_buckets(values, bins)
    }

    pub fn provincial_rollup(
        &self,
        scope: &ScopeDescriptor,
        selection: &ThemeSelection,
        theme_keys: Option<&[String]>,
    ) -> Result<Vec<ProvinceRollup>> {
        Ok(reports::provincial_rollup(
            self.unified_model()?,
            scope,
            selection,
            self.keys_or_default(theme_keys),
            self.config.high_threshold,
        ))
    }

    pub fn district_rollup(
        &self,
        scope: &ScopeDescriptor,
        selection: &ThemeSelection,
        theme_keys: Option<&[String]>,
        province: &str,
    ) -> Result<Vec<GroupSummary>> {
        Ok(reports::district_rollup(
            self.unified_model()?,
            scope,
            selection,
            self.keys_or_default(theme_keys),
            self.config.high_threshold,
            province,
        ))
    }

    pub fn overview(&self) -> Result<Overview> {
        let ds = self.dataset()?;
        Ok(reports::overview(
            &ds.model.records,
            ds.mapped_municipalities,
            ds.pdi_rows,
            self.config.high_threshold,
        ))
    }

    pub fn provincial_stats(&self) -> Result<Vec<ProvincialStat>> {
        Ok(reports::provincial_stats(
            self.unified_model()?,
            self.config.high_threshold,
        ))
    }

    pub fn complexity_levels(&self, scope: &ScopeDescriptor) -> Result<ComplexityDistribution> {
        Ok(ranking::complexity_levels(self.unified_model()?, scope))
    }

    pub fn slicer_options(&self) -> Result<SlicerOptions> {
        Ok(SlicerOptions::from_model(self.unified_model()?))
    }

    pub fn municipality_profile(
        &self,
        code: &str,
        theme_keys: Option<&[String]>,
    ) -> Result<Option<MunicipalityProfile>> {
        Ok(municipality_profile(
            self.unified_model()?,
            code,
            self.keys_or_default(theme_keys),
        ))
    }

    pub fn theme_vector(
        &self,
        scope: &ScopeDescriptor,
        theme_keys: Option<&[String]>,
    ) -> Result<Vec<ThemeAverage>> {
        Ok(theme_vector(
            self.unified_model()?,
            scope,
            self.keys_or_default(theme_keys),
        ))
    }

    pub fn indicators(&self) -> Result<&[Indicator]> {
        Ok(&self.dataset()?.indicators)
    }

    /// Indicator fact rows, fetched on first use. A failure here is returned
    /// to the caller and retried on the next call; the core dataset is not
    /// affected.
    pub fn indicator_facts(&self) -> Result<&[IndicatorFact]> {
        self.dataset()?;
        let facts = self.facts.get_or_try_init(|| {
            let table = self.fetch_table(&self.config.resources.indicator_facts)?;
            let facts = facts_from_table(&table);
            info!(rows = table.len(), facts = facts.len(), "indicator facts loaded");
            Ok::<_, PdiError>(facts)
        })?;
        Ok(facts)
    }

    /// Mean of every indicator over the municipalities in `scope`.
    pub fn indicator_profile(&self, scope: &ScopeDescriptor) -> Result<Vec<IndicatorValue>> {
        let model = self.unified_model()?;
        let facts = self.indicator_facts()?;
        let codes: BTreeSet<&str> = scope
            .apply(model)
            .into_iter()
            .map(|r| r.muni_code.as_str())
            .collect();
        Ok(indicator_profile(self.indicators()?, facts, &codes))
    }
}
