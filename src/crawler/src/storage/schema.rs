//! SQLite schema definitions for crawled race data
//!
//! Tables:
//! - race_info: Race metadata and payouts, keyed by race ID
//! - race_data: Finishing horses, one row per entrant

use rusqlite::{Connection, Result};

/// Create all tables in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    // Race metadata and payouts
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS race_info (
            race_id                     TEXT PRIMARY KEY,
            year                        INTEGER NOT NULL,
            month                       INTEGER NOT NULL,
            day                         INTEGER NOT NULL,
            venue                       TEXT NOT NULL,
            race_number                 INTEGER NOT NULL,
            race_name                   TEXT NOT NULL,
            course_type                 TEXT NOT NULL,
            course_direction            TEXT NOT NULL,
            course_distance             INTEGER NOT NULL,
            weather                     TEXT NOT NULL,
            course_state                TEXT NOT NULL,
            win_number                  TEXT,
            win_refund                  TEXT,
            win_population              TEXT,
            place_number                TEXT,
            place_refund                TEXT,
            place_population            TEXT,
            bracket_quinella_number     TEXT,
            bracket_quinella_refund     TEXT,
            bracket_quinella_population TEXT,
            quinella_number             TEXT,
            quinella_refund             TEXT,
            quinella_population         TEXT,
            quinella_place_number       TEXT,
            quinella_place_refund       TEXT,
            quinella_place_population   TEXT,
            exacta_number               TEXT,
            exacta_refund               TEXT,
            exacta_population           TEXT,
            trio_number                 TEXT,
            trio_refund                 TEXT,
            trio_population             TEXT,
            tierce_number               TEXT,
            tierce_refund               TEXT,
            tierce_population           TEXT
        )
        "#,
        [],
    )?;

    // Finishing horses
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS race_data (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            race_id           TEXT NOT NULL REFERENCES race_info(race_id),
            horse_id          TEXT NOT NULL,
            rank              INTEGER NOT NULL,
            slot              INTEGER,
            horse_num         INTEGER NOT NULL,
            horse_name        TEXT NOT NULL,
            horse_gender      TEXT,
            horse_age         INTEGER,
            jockey_weight     REAL,
            jockey_name       TEXT NOT NULL,
            goal_time         REAL,
            last_time         REAL,
            odds              REAL,
            popularity        INTEGER,
            horse_weight      INTEGER,
            horse_weight_diff INTEGER,
            trainer           TEXT NOT NULL,
            prize             REAL,
            odds_place        REAL
        )
        "#,
        [],
    )?;

    // Existing-index lookups filter on year
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_race_info_year ON race_info(year)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_race_data_race ON race_data(race_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_race_data_horse ON race_data(horse_id)",
        [],
    )?;

    Ok(())
}
