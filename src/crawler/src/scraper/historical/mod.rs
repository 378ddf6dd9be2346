//! Historical data scraper for db.netkeiba.com
//!
//! Result pages are the only historical source the crawler reads.

#[cfg(test)]
pub mod fixtures;
pub mod race_result;

pub use race_result::RaceResultParser;

use crate::race_id::RaceId;

/// Build race result URL
/// URL: https://db.netkeiba.com/race/RACEID/
pub fn race_result_url(base_url: &str, race_id: &RaceId) -> String {
    format!("{}/race/{}/", base_url.trim_end_matches('/'), race_id)
}
