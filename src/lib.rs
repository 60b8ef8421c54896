// Data layer for the PDI dashboard: tolerant CSV ingestion, the
// municipality join, scoped aggregation, ranking and bucketing.
//
// Views talk to a [`store::DataStore`]; everything below it is plain
// functions over the immutable unified model.
pub mod config;
pub mod error;
pub mod indicator;
pub mod join;
pub mod loader;
pub mod logging;
pub mod options;
pub mod output;
pub mod profile;
pub mod ranking;
pub mod reports;
pub mod schema;
pub mod scope;
pub mod source;
pub mod store;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::{PdiError, Result};
pub use scope::{ScopeDescriptor, ScopeMode};
pub use source::{DirSource, MemorySource, ResourceSource};
pub use store::DataStore;
pub use types::{Direction, ThemeSelection, UnifiedRecord};
