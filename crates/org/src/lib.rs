pub mod checker;
pub mod config;
pub mod importer;
pub mod manifest;
pub mod progress;
pub mod series;

pub use checker::{CheckError, CheckEvent, CheckOutcome, CheckReport, Checker, FileCheck};
pub use config::{Config, ConfigError, DigestConfig, CONFIG_FILENAME};
pub use importer::{
    CommitFailure, ImportCandidate, ImportError, ImportPlan, Importer, ValidationError,
};
pub use manifest::{ManifestEntry, ManifestError, ManifestListing, ManifestStore};
pub use progress::{digest_with_progress, NoProgress, Progress};
pub use series::{Series, SeriesError, SeriesStatus};
