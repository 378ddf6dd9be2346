//! SQLite repository for crawled race data

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::warn;

use super::row::{entrant_row, race_info_row, Cell, RACE_DATA_COLUMNS, RACE_INFO_COLUMNS};
use super::schema::create_tables;
use super::RaceStore;
use crate::error::CrawlError;
use crate::race_id::RaceId;
use crate::types::{
    BetCategory, CourseDirection, CourseSurface, EntrantResult, PayoutEntry, PayoutTable,
    RaceInfo, Sex,
};

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            Cell::Null => Value::Null,
            Cell::Int(i) => Value::Integer(*i),
            Cell::Real(f) => Value::Real(*f),
            Cell::Text(s) => Value::Text(s.clone()),
        }))
    }
}

fn insert_sql<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    let names: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Primary key violations are conflicts; everything else means the store is unusable
fn map_write_error(race_id: RaceId, err: rusqlite::Error) -> CrawlError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            CrawlError::PersistenceConflict(race_id)
        }
        _ => CrawlError::PersistenceUnavailable(err.to_string()),
    }
}

/// Repository for crawled race data
pub struct RaceRepository {
    conn: Connection,
    insert_info_sql: String,
    insert_entry_sql: String,
}

impl RaceRepository {
    /// Create a new repository, initializing the database if needed
    pub fn new(db_path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path).context("Failed to open database")?;

        // Enable foreign keys
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        // Create tables if they don't exist
        create_tables(&conn)?;

        Ok(Self::with_connection(conn))
    }

    /// Create an in-memory repository (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        create_tables(&conn)?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            insert_info_sql: insert_sql("race_info", RACE_INFO_COLUMNS.as_slice()),
            insert_entry_sql: insert_sql("race_data", RACE_DATA_COLUMNS.as_slice()),
        }
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn insert_race(&mut self, info: &RaceInfo, entries: &[EntrantResult]) -> rusqlite::Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(&self.insert_info_sql, params_from_iter(race_info_row(info)))?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_entry_sql)?;
            for entry in entries {
                stmt.execute(params_from_iter(entrant_row(entry)))?;
            }
        }
        // Dropping an uncommitted transaction rolls it back
        tx.commit()
    }

    // ==================== Query Operations ====================

    /// Load a stored race and its entrants, ordered by finishing rank
    pub fn load_race(&self, race_id: &RaceId) -> Result<Option<(RaceInfo, Vec<EntrantResult>)>> {
        let id = race_id.to_string();

        let info = self
            .conn
            .query_row(
                "SELECT * FROM race_info WHERE race_id = ?1",
                [&id],
                |row| read_race_info(row, *race_id),
            )
            .optional()
            .context("Failed to read race_info")?;

        let Some(info) = info else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT * FROM race_data WHERE race_id = ?1 ORDER BY rank, horse_num",
        )?;
        let entries = stmt
            .query_map([&id], |row| read_entrant(row, *race_id))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read race_data")?;

        Ok(Some((info, entries)))
    }

    /// Get race count
    pub fn race_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM race_info", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl RaceStore for RaceRepository {
    fn existing(&self, start_year: u16, end_year: u16) -> Result<BTreeSet<RaceId>, CrawlError> {
        let unavailable = |e: rusqlite::Error| CrawlError::PersistenceUnavailable(e.to_string());

        // Keyed on the identifier's year, which can differ from the race date
        let low = format!("{:04}00000000", start_year);
        let high = format!("{:04}99999999", end_year);
        let mut stmt = self
            .conn
            .prepare("SELECT race_id FROM race_info WHERE race_id BETWEEN ?1 AND ?2")
            .map_err(unavailable)?;
        let ids = stmt
            .query_map(params![low, high], |row| row.get::<_, String>(0))
            .map_err(unavailable)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(unavailable)?;

        let mut existing = BTreeSet::new();
        for id in ids {
            match id.parse::<RaceId>() {
                Ok(race_id) => {
                    existing.insert(race_id);
                }
                Err(_) => warn!("Ignoring malformed race_id in race_info: {}", id),
            }
        }
        Ok(existing)
    }

    fn write(&mut self, info: &RaceInfo, entries: &[EntrantResult]) -> Result<(), CrawlError> {
        self.insert_race(info, entries)
            .map_err(|e| map_write_error(info.race_id, e))
    }
}

fn read_race_info(row: &Row<'_>, race_id: RaceId) -> rusqlite::Result<RaceInfo> {
    let year: i32 = row.get("year")?;
    let month: u32 = row.get("month")?;
    let day: u32 = row.get("day")?;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid_text("year/month/day", format!("{}-{}-{}", year, month, day)))?;

    let surface_text: String = row.get("course_type")?;
    let surface = CourseSurface::from_str_opt(&surface_text)
        .ok_or_else(|| invalid_text("course_type", surface_text))?;
    let direction_text: String = row.get("course_direction")?;
    let direction = CourseDirection::from_str_opt(&direction_text)
        .ok_or_else(|| invalid_text("course_direction", direction_text))?;

    let mut payout = PayoutTable::default();
    for category in BetCategory::ALL {
        let prefix = category.column_prefix();
        let combination: Option<String> = row.get(format!("{}_number", prefix).as_str())?;
        let refund: Option<String> = row.get(format!("{}_refund", prefix).as_str())?;
        let popularity: Option<String> = row.get(format!("{}_population", prefix).as_str())?;
        if let Some(combination) = combination {
            payout.set(
                category,
                PayoutEntry {
                    combination,
                    refund: refund.unwrap_or_default(),
                    popularity: popularity.unwrap_or_default(),
                },
            );
        }
    }

    Ok(RaceInfo {
        race_id,
        date,
        venue: row.get("venue")?,
        race_number: row.get("race_number")?,
        race_name: row.get("race_name")?,
        surface,
        direction,
        distance: row.get("course_distance")?,
        weather: row.get("weather")?,
        condition: row.get("course_state")?,
        payout: (!payout.is_empty()).then_some(payout),
    })
}

fn read_entrant(row: &Row<'_>, race_id: RaceId) -> rusqlite::Result<EntrantResult> {
    let sex: Option<String> = row.get("horse_gender")?;

    Ok(EntrantResult {
        race_id,
        horse_id: row.get("horse_id")?,
        rank: row.get("rank")?,
        bracket: row.get("slot")?,
        horse_number: row.get("horse_num")?,
        horse_name: row.get("horse_name")?,
        sex: sex.and_then(|s| s.chars().next()).and_then(Sex::from_char),
        age: row.get("horse_age")?,
        jockey_weight: row.get("jockey_weight")?,
        jockey_name: row.get("jockey_name")?,
        finish_time: row.get("goal_time")?,
        last_3f: row.get("last_time")?,
        win_odds: row.get("odds")?,
        popularity: row.get("popularity")?,
        horse_weight: row.get("horse_weight")?,
        weight_change: row.get("horse_weight_diff")?,
        trainer_name: row.get("trainer")?,
        prize: row.get("prize")?,
        place_payout: row.get("odds_place")?,
    })
}

fn invalid_text(column: &str, value: String) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(
        0,
        format!("{} = {:?}", column, value),
        rusqlite::types::Type::Text,
    )
}
