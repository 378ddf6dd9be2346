//! Race records produced by the extractor and persisted by the stores.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CrawlError;
use crate::race_id::RaceId;

/// Venue names indexed by `venue_code - 1`
pub const VENUE_NAMES: [&str; 10] = [
    "札幌", "函館", "福島", "新潟", "東京", "中山", "中京", "京都", "阪神", "小倉",
];

/// Look up the display name for a venue code (1-10)
pub fn venue_name(code: u8) -> Result<&'static str, CrawlError> {
    code.checked_sub(1)
        .and_then(|i| VENUE_NAMES.get(i as usize))
        .copied()
        .ok_or(CrawlError::Lookup(code))
}

/// Course surface. Jump courses can run over both turf and dirt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CourseSurface {
    pub turf: bool,
    pub dirt: bool,
}

impl CourseSurface {
    pub fn is_mixed(&self) -> bool {
        self.turf && self.dirt
    }

    pub fn as_str(&self) -> &'static str {
        match (self.turf, self.dirt) {
            (true, true) => "turf/dirt",
            (true, false) => "turf",
            (false, true) => "dirt",
            (false, false) => "",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "turf/dirt" => Some(Self { turf: true, dirt: true }),
            "turf" => Some(Self { turf: true, dirt: false }),
            "dirt" => Some(Self { turf: false, dirt: true }),
            _ => None,
        }
    }
}

/// Course direction, matched in this priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseDirection {
    Left,
    Right,
    Jump,
    Straight,
}

impl CourseDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseDirection::Left => "left",
            CourseDirection::Right => "right",
            CourseDirection::Jump => "jump",
            CourseDirection::Straight => "straight",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "left" => Some(CourseDirection::Left),
            "right" => Some(CourseDirection::Right),
            "jump" => Some(CourseDirection::Jump),
            "straight" => Some(CourseDirection::Straight),
            _ => None,
        }
    }
}

/// Horse sex (牡 / 牝 / セ)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Colt,
    Filly,
    Gelding,
}

impl Sex {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '牡' => Some(Sex::Colt),
            '牝' => Some(Sex::Filly),
            'セ' | '騸' => Some(Sex::Gelding),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Sex::Colt => '牡',
            Sex::Filly => '牝',
            Sex::Gelding => 'セ',
        }
    }
}

/// Bet categories on the payout tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetCategory {
    Win,
    Place,
    BracketQuinella,
    Quinella,
    QuinellaPlace,
    Exacta,
    Trio,
    Tierce,
}

impl BetCategory {
    pub const ALL: [BetCategory; 8] = [
        BetCategory::Win,
        BetCategory::Place,
        BetCategory::BracketQuinella,
        BetCategory::Quinella,
        BetCategory::QuinellaPlace,
        BetCategory::Exacta,
        BetCategory::Trio,
        BetCategory::Tierce,
    ];

    fn index(&self) -> usize {
        *self as usize
    }

    /// Column prefix in the stores
    pub fn column_prefix(&self) -> &'static str {
        match self {
            BetCategory::Win => "win",
            BetCategory::Place => "place",
            BetCategory::BracketQuinella => "bracket_quinella",
            BetCategory::Quinella => "quinella",
            BetCategory::QuinellaPlace => "quinella_place",
            BetCategory::Exacta => "exacta",
            BetCategory::Trio => "trio",
            BetCategory::Tierce => "tierce",
        }
    }

    /// Class attribute on the payout row header
    pub fn marker_class(&self) -> &'static str {
        match self {
            BetCategory::Win => "tan",
            BetCategory::Place => "fuku",
            BetCategory::BracketQuinella => "waku",
            BetCategory::Quinella => "uren",
            BetCategory::QuinellaPlace => "wide",
            BetCategory::Exacta => "utan",
            BetCategory::Trio => "sanfuku",
            BetCategory::Tierce => "santan",
        }
    }

    /// Header text on the payout row
    pub fn label(&self) -> &'static str {
        match self {
            BetCategory::Win => "単勝",
            BetCategory::Place => "複勝",
            BetCategory::BracketQuinella => "枠連",
            BetCategory::Quinella => "馬連",
            BetCategory::QuinellaPlace => "ワイド",
            BetCategory::Exacta => "馬単",
            BetCategory::Trio => "三連複",
            BetCategory::Tierce => "三連単",
        }
    }
}

/// One payout row: winning combination(s), refunds and popularity ranks.
///
/// Multiple winners (place, quinella-place) are space separated in the same
/// order across all three fields. Refunds are in yen per 100 yen staked with
/// thousands separators removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub combination: String,
    pub refund: String,
    pub popularity: String,
}

/// Payouts by bet category. Categories missing from the page are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayoutTable {
    entries: [Option<PayoutEntry>; 8],
}

impl PayoutTable {
    pub fn get(&self, category: BetCategory) -> Option<&PayoutEntry> {
        self.entries[category.index()].as_ref()
    }

    pub fn set(&mut self, category: BetCategory, entry: PayoutEntry) {
        self.entries[category.index()] = Some(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }
}

/// Race metadata, one per race ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceInfo {
    pub race_id: RaceId,
    pub date: NaiveDate,
    pub venue: String,
    pub race_number: u8,
    pub race_name: String,
    pub surface: CourseSurface,
    pub direction: CourseDirection,
    /// Meters
    pub distance: u32,
    pub weather: String,
    /// `"<turf>/<dirt>"` on mixed courses
    pub condition: String,
    pub payout: Option<PayoutTable>,
}

/// One finishing horse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrantResult {
    pub race_id: RaceId,
    pub horse_id: String,
    pub rank: u8,
    pub bracket: Option<u8>,
    pub horse_number: u8,
    pub horse_name: String,
    pub sex: Option<Sex>,
    pub age: Option<u8>,
    /// Kilograms carried
    pub jockey_weight: Option<f64>,
    pub jockey_name: String,
    /// Seconds
    pub finish_time: Option<f64>,
    pub last_3f: Option<f64>,
    pub win_odds: Option<f64>,
    pub popularity: Option<u8>,
    pub horse_weight: Option<u32>,
    pub weight_change: Option<i32>,
    pub trainer_name: String,
    /// 10,000 yen units
    pub prize: Option<f64>,
    /// Place refund per 1 yen staked
    pub place_payout: Option<f64>,
}
