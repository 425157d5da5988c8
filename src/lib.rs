pub mod binder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod readiness;
pub mod transport;

// Template Modules
pub mod structs;
pub mod parser;
pub mod query;

// Public API
pub use binder::{Binder, ResourceDescriptor, ResourceHandle};
pub use catalog::Catalog;
pub use config::ConsoleConfig;
pub use error::{BindingError, ConfigError, Error, FetchError, ReadinessError, Result};
pub use parser::QueryTemplate;
pub use readiness::{FailurePolicy, ReadinessGate, ReadinessOptions, ReadinessReport, ReadinessState};
pub use structs::{
    ConglomerateRow, ExplainPlanNode, FetchResult, Params, PlaceholderTarget, ResultShape, StatRow,
    StatementRecord, StatementSqlRow,
};
pub use transport::{HttpTransport, Transport};
pub use tokio_util::sync::CancellationToken;
