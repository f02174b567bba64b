use scraper::Html;

pub mod gfg;
pub mod language;
pub mod notion;
pub mod record;
pub mod relay;
pub mod settings;

mod error;

pub use error::SyncError;
pub use record::{Difficulty, ProblemRecord};

/// A site-specific extractor turns a parsed page into a structured record.
/// Absence is explicit: an unrecognized page yields `None`, never a panic.
pub trait Extractor {
    type Record: std::fmt::Debug;

    fn can_extract(&self, url: &str) -> bool;
    fn extract(&self, doc: &Html, url: &str) -> Option<Self::Record>;
}
