//! Race identifiers and the candidate key space.
//!
//! A race ID is `YYYYVVNNDDRR`: year, venue code, meeting number, day number
//! and race number. The same 12-digit text is the primary key in every store.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrawlError;

pub const VENUE_COUNT: u8 = 10;
pub const MEETING_COUNT: u8 = 10;
pub const DAY_COUNT: u8 = 10;
pub const RACE_COUNT: u8 = 12;

/// Number of candidate IDs per year (10 x 10 x 10 x 12)
pub const IDS_PER_YEAR: usize =
    VENUE_COUNT as usize * MEETING_COUNT as usize * DAY_COUNT as usize * RACE_COUNT as usize;

/// Composite race key. Field order gives the total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RaceId {
    year: u16,
    venue: u8,
    meeting: u8,
    day: u8,
    race: u8,
}

impl RaceId {
    pub fn new(year: u16, venue: u8, meeting: u8, day: u8, race: u8) -> Result<Self, CrawlError> {
        let in_range = (1000..=9999).contains(&year)
            && (1..=VENUE_COUNT).contains(&venue)
            && (1..=MEETING_COUNT).contains(&meeting)
            && (1..=DAY_COUNT).contains(&day)
            && (1..=RACE_COUNT).contains(&race);

        if !in_range {
            return Err(CrawlError::InvalidRaceId(format!(
                "{}/{}/{}/{}/{}",
                year, venue, meeting, day, race
            )));
        }

        Ok(Self {
            year,
            venue,
            meeting,
            day,
            race,
        })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn venue(&self) -> u8 {
        self.venue
    }

    pub fn meeting(&self) -> u8 {
        self.meeting
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn race(&self) -> u8 {
        self.race
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}{:02}{:02}",
            self.year, self.venue, self.meeting, self.day, self.race
        )
    }
}

impl FromStr for RaceId {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CrawlError::InvalidRaceId(s.to_string());

        if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: u16 = s[0..4].parse().map_err(|_| invalid())?;
        let field = |range: std::ops::Range<usize>| s[range].parse::<u8>().map_err(|_| invalid());

        RaceId::new(year, field(4..6)?, field(6..8)?, field(8..10)?, field(10..12)?)
            .map_err(|_| invalid())
    }
}

impl TryFrom<String> for RaceId {
    type Error = CrawlError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RaceId> for String {
    fn from(id: RaceId) -> Self {
        id.to_string()
    }
}

fn check_range(start_year: u16, end_year: u16) -> Result<(), CrawlError> {
    if start_year > end_year || start_year < 1000 || end_year > 9999 {
        return Err(CrawlError::InvalidYearRange {
            start: start_year,
            end: end_year,
        });
    }
    Ok(())
}

/// Every candidate ID for the inclusive year range, ascending
pub fn enumerate(start_year: u16, end_year: u16) -> Result<Vec<RaceId>, CrawlError> {
    check_range(start_year, end_year)?;

    let years = (end_year - start_year) as usize + 1;
    let mut ids = Vec::with_capacity(IDS_PER_YEAR * years);

    for year in start_year..=end_year {
        for venue in 1..=VENUE_COUNT {
            for meeting in 1..=MEETING_COUNT {
                for day in 1..=DAY_COUNT {
                    for race in 1..=RACE_COUNT {
                        ids.push(RaceId {
                            year,
                            venue,
                            meeting,
                            day,
                            race,
                        });
                    }
                }
            }
        }
    }

    Ok(ids)
}

/// Candidates still to crawl: the enumerated space minus what is already stored
pub fn plan(
    start_year: u16,
    end_year: u16,
    existing: &BTreeSet<RaceId>,
) -> Result<Vec<RaceId>, CrawlError> {
    let all: BTreeSet<RaceId> = enumerate(start_year, end_year)?.into_iter().collect();
    Ok(all.difference(existing).copied().collect())
}
