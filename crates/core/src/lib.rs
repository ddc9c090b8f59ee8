//! organizer-core
//!
//! Core library for sorting files into user-defined categories picked by a
//! language model.
//!
//! This crate holds the file inspector, the label tree, the classification
//! engine (context rendering + response parsing), the organizer that moves
//! files and keeps run statistics, and the oracle adapters that talk to model
//! providers.
//!
//! All substantive logic lives here so it is fully testable without a network
//! and reusable from multiple frontends (CLI, GUI, etc.).

pub mod config;
pub mod inspect;
pub mod labels;
pub mod model;
pub mod organize;
pub mod services;

pub use config::ConfigurationError;
pub use inspect::{FileInspector, InspectionError, InspectorOptions};
pub use labels::{LabelNode, LabelTree, RawLabels};
pub use model::{Classification, FileRecord};
pub use organize::{organize, CancellationToken, OrganizeOptions, Organizer, RunStatistics};
pub use services::classify::ClassificationEngine;
pub use services::oracle::{LabelingOracle, OracleError, OracleErrorKind, OracleRequest};

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
