//! genmig core - migration coordinator
//!
//! Brings a scaffolded project from one released generator version to the
//! next:
//! - resolves placeholder values from the project's own files
//! - fetches the generator's latest version and template diff
//! - renders and applies each upstream hunk to the local files
//! - commits the result and the new tracked version
//!
//! # Example
//!
//! ```rust,ignore
//! use genmig_core::{MigrationConfig, Migrator, RunOutcome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MigrationConfig::new("acme/generator-widget".parse()?)
//!     .with_template_prefix("generators/app/templates")
//!     .with_project_root("./my-widget");
//!
//! match Migrator::github(config)?.run().await {
//!     RunOutcome::Migrated(report) => println!("{report}"),
//!     RunOutcome::AlreadyUpToDate { version, .. } => println!("up to date at {version}"),
//!     RunOutcome::Aborted(error) => return Err(error.into()),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod coordinator;
mod documents;
pub mod engine;
pub mod error;
pub mod github;
pub mod local;
pub mod lock;
pub mod report;
pub mod resolver;
pub mod source;
pub mod staging;
pub mod state;

// Re-exports for convenience
pub use config::{AccessToken, GeneratorId, MigrationConfig};
pub use coordinator::{MigrationRun, Migrator, RunOutcome};
pub use engine::{FilePlan, MigrationEngine};
pub use error::{CommitError, ConfigError, FetchError, MigrationError};
pub use github::GithubClient;
pub use local::DiffFileSource;
pub use lock::RunLock;
pub use report::{FileReport, MigrationReport};
pub use resolver::PropertyResolver;
pub use source::{DiffSource, GeneratorMetadata, MetadataSource, StaticMetadata};
pub use staging::{StagedChange, StagedFile, StagingArea};
pub use state::{VersionState, VersionStateStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with genmig core
    pub use crate::{
        DiffSource, GeneratorId, MetadataSource, MigrationConfig, MigrationError, MigrationReport,
        Migrator, RunOutcome,
    };
    pub use genmig_apply::{ApplyResult, ConflictKind, ConflictPolicy, HunkOutcome};
    pub use genmig_hunk::DelimiterSpec;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
