//! Flat column layout shared by the SQLite and CSV backends.

use std::sync::LazyLock;

use crate::types::{BetCategory, EntrantResult, RaceInfo};

/// Fixed race_info columns ahead of the payout columns
const RACE_INFO_BASE_COLUMNS: [&str; 12] = [
    "race_id",
    "year",
    "month",
    "day",
    "venue",
    "race_number",
    "race_name",
    "course_type",
    "course_direction",
    "course_distance",
    "weather",
    "course_state",
];

/// race_info columns: base columns, then number/refund/population per bet category
pub static RACE_INFO_COLUMNS: LazyLock<Vec<String>> = LazyLock::new(|| {
    let mut columns: Vec<String> = RACE_INFO_BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for category in BetCategory::ALL {
        let prefix = category.column_prefix();
        columns.push(format!("{}_number", prefix));
        columns.push(format!("{}_refund", prefix));
        columns.push(format!("{}_population", prefix));
    }
    columns
});

/// race_data columns
pub const RACE_DATA_COLUMNS: [&str; 19] = [
    "race_id",
    "horse_id",
    "rank",
    "slot",
    "horse_num",
    "horse_name",
    "horse_gender",
    "horse_age",
    "jockey_weight",
    "jockey_name",
    "goal_time",
    "last_time",
    "odds",
    "popularity",
    "horse_weight",
    "horse_weight_diff",
    "trainer",
    "prize",
    "odds_place",
];

/// One column value, independent of the backend that stores it
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Real(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

fn opt<T: Into<Cell>>(value: Option<T>) -> Cell {
    value.map(Into::into).unwrap_or(Cell::Null)
}

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

/// Values for one race_info row, in `RACE_INFO_COLUMNS` order
pub fn race_info_row(info: &RaceInfo) -> Vec<Cell> {
    use chrono::Datelike;

    let mut row = vec![
        text(&info.race_id.to_string()),
        Cell::Int(info.date.year() as i64),
        Cell::Int(info.date.month() as i64),
        Cell::Int(info.date.day() as i64),
        text(&info.venue),
        Cell::Int(info.race_number as i64),
        text(&info.race_name),
        text(info.surface.as_str()),
        text(info.direction.as_str()),
        Cell::Int(info.distance as i64),
        text(&info.weather),
        text(&info.condition),
    ];

    for category in BetCategory::ALL {
        match info.payout.as_ref().and_then(|p| p.get(category)) {
            Some(entry) => {
                row.push(text(&entry.combination));
                row.push(text(&entry.refund));
                row.push(text(&entry.popularity));
            }
            None => row.extend([Cell::Null, Cell::Null, Cell::Null]),
        }
    }

    row
}

/// Values for one race_data row, in `RACE_DATA_COLUMNS` order
pub fn entrant_row(entry: &EntrantResult) -> Vec<Cell> {
    vec![
        text(&entry.race_id.to_string()),
        text(&entry.horse_id),
        Cell::Int(entry.rank as i64),
        opt(entry.bracket.map(i64::from)),
        Cell::Int(entry.horse_number as i64),
        text(&entry.horse_name),
        opt(entry.sex.map(|s| s.as_char().to_string())),
        opt(entry.age.map(i64::from)),
        opt(entry.jockey_weight),
        text(&entry.jockey_name),
        opt(entry.finish_time),
        opt(entry.last_3f),
        opt(entry.win_odds),
        opt(entry.popularity.map(i64::from)),
        opt(entry.horse_weight.map(i64::from)),
        opt(entry.weight_change.map(i64::from)),
        text(&entry.trainer_name),
        opt(entry.prize),
        opt(entry.place_payout),
    ]
}

/// Render a value as a CSV field; NULL becomes an empty field
pub fn csv_field(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::Int(i) => i.to_string(),
        Cell::Real(f) => f.to_string(),
        Cell::Text(s) => s.clone(),
    }
}
