//! Shared builders and doubles for unit tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CrawlError;
use crate::race_id::RaceId;
use crate::scraper::{FetchOutcome, Fetcher};
use crate::storage::RaceStore;
use crate::types::{
    venue_name, BetCategory, CourseDirection, CourseSurface, EntrantResult, PayoutEntry,
    PayoutTable, RaceInfo, Sex,
};

fn payout(combination: &str, refund: &str, popularity: &str) -> PayoutEntry {
    PayoutEntry {
        combination: combination.to_string(),
        refund: refund.to_string(),
        popularity: popularity.to_string(),
    }
}

/// A turf race at the ID's venue with win, place and quinella payouts
pub fn sample_race(id: &str) -> RaceInfo {
    let race_id: RaceId = id.parse().unwrap();

    let mut table = PayoutTable::default();
    table.set(BetCategory::Win, payout("3", "210", "1"));
    table.set(BetCategory::Place, payout("3 7 1", "110 160 290", "1 3 5"));
    table.set(BetCategory::Quinella, payout("3 - 7", "1230", "4"));

    RaceInfo {
        race_id,
        date: NaiveDate::from_ymd_opt(race_id.year() as i32, 5, 26).unwrap(),
        venue: venue_name(race_id.venue()).unwrap().to_string(),
        race_number: race_id.race(),
        race_name: "東京優駿".to_string(),
        surface: CourseSurface {
            turf: true,
            dirt: false,
        },
        direction: CourseDirection::Left,
        distance: 2400,
        weather: "晴".to_string(),
        condition: "良".to_string(),
        payout: Some(table),
    }
}

/// Entrant with horse number and rank `n`
pub fn sample_entry(race: &RaceInfo, n: u8) -> EntrantResult {
    EntrantResult {
        race_id: race.race_id,
        horse_id: format!("20191{:05}", n),
        rank: n,
        bracket: Some(n.div_ceil(2)),
        horse_number: n,
        horse_name: format!("テストホース{}", n),
        sex: Some(Sex::Colt),
        age: Some(3),
        jockey_weight: Some(57.0),
        jockey_name: format!("騎手{}", n),
        finish_time: Some(143.5 + n as f64 / 10.0),
        last_3f: Some(34.0),
        win_odds: Some(2.5 * n as f64),
        popularity: Some(n),
        horse_weight: Some(480),
        weight_change: Some(-2),
        trainer_name: format!("調教師{}", n),
        prize: Some(20000.0 / n as f64),
        place_payout: (n <= 3).then(|| 1.1 * n as f64),
    }
}

/// Fetcher serving canned outcomes and recording every request
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<RaceId, String>,
    failing: BTreeSet<RaceId>,
    pub requests: Mutex<Vec<RaceId>>,
}

impl MockFetcher {
    pub fn with_page(mut self, id: &str, html: impl Into<String>) -> Self {
        self.pages.insert(id.parse().unwrap(), html.into());
        self
    }

    pub fn with_failure(mut self, id: &str) -> Self {
        self.failing.insert(id.parse().unwrap());
        self
    }

    pub fn requested(&self) -> Vec<RaceId> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, race_id: &RaceId) -> Result<FetchOutcome, CrawlError> {
        self.requests.lock().unwrap().push(*race_id);
        if self.failing.contains(race_id) {
            return Err(CrawlError::Fetch("connection reset".to_string()));
        }
        Ok(match self.pages.get(race_id) {
            Some(html) => FetchOutcome::Page(html.clone()),
            None => FetchOutcome::Absent,
        })
    }
}

/// Store whose writes always fail as unavailable
#[derive(Default)]
pub struct UnavailableStore {
    pub attempts: usize,
}

impl RaceStore for UnavailableStore {
    fn existing(&self, _start_year: u16, _end_year: u16) -> Result<BTreeSet<RaceId>, CrawlError> {
        Ok(BTreeSet::new())
    }

    fn write(&mut self, _info: &RaceInfo, _entries: &[EntrantResult]) -> Result<(), CrawlError> {
        self.attempts += 1;
        Err(CrawlError::PersistenceUnavailable("disk full".to_string()))
    }
}
