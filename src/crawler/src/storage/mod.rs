//! Storage for crawled race data
//!
//! Two interchangeable backends hold the same two record shapes:
//! - `race_info`: one row per race, keyed by the 12-digit race ID
//! - `race_data`: one row per finishing horse
//!
//! A race and its entrants are written as one unit; a failed write leaves
//! nothing behind for that race.

pub mod csv_store;
pub mod repository;
pub mod row;
pub mod schema;

use std::collections::BTreeSet;

use crate::error::CrawlError;
use crate::race_id::RaceId;
use crate::types::{EntrantResult, RaceInfo};

pub use csv_store::CsvRepository;
pub use repository::RaceRepository;

/// Existing-record index and writer over a persistence backend
pub trait RaceStore {
    /// IDs already persisted for races in the inclusive year range
    fn existing(&self, start_year: u16, end_year: u16) -> Result<BTreeSet<RaceId>, CrawlError>;

    /// Persist a race and its entrants atomically.
    ///
    /// Fails with `PersistenceConflict` if the race ID is already stored and
    /// with `PersistenceUnavailable` for any other storage failure.
    fn write(&mut self, info: &RaceInfo, entries: &[EntrantResult]) -> Result<(), CrawlError>;
}
