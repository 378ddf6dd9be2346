//! Race result parser for db.netkeiba.com
//!
//! Parses historical race result pages into race info, payouts and
//! finishing entrants.
//! URL: https://db.netkeiba.com/race/RACEID/

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::CrawlError;
use crate::normalize::{
    match_place_payout, normalize_amounts, parse_decimal, parse_horse_weight, parse_int,
    parse_rank, place_payouts, to_seconds,
};
use crate::race_id::RaceId;
use crate::types::{
    venue_name, BetCategory, CourseDirection, CourseSurface, EntrantResult, PayoutEntry,
    PayoutTable, RaceInfo, Sex,
};

static RESULT_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.race_table_01").unwrap());
static RACE_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl.racedata h1").unwrap());
static CONDITIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl.racedata span").unwrap());
static SUMMARY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.data_intro p.smalltxt").unwrap());
static PAYOUT_ROWS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.pay_table_01 tr").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)年(\d+)月(\d+)日").unwrap());
static DISTANCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})m").unwrap());
static MIXED_CONDITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"芝\s*:\s*(\S+?)\s*ダート\s*:\s*(\S+)").unwrap());
static HORSE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/horse/(\w+)").unwrap());

// Result table columns
// 着順, 枠番, 馬番, 馬名, 性齢, 斤量, 騎手, タイム, 着差, タイム指数, 通過, 上り,
// 単勝, 人気, 馬体重, 調教タイム, 厩舎コメント, 備考, 調教師, 馬主, 賞金
const COL_RANK: usize = 0;
const COL_BRACKET: usize = 1;
const COL_NUMBER: usize = 2;
const COL_HORSE: usize = 3;
const COL_SEX_AGE: usize = 4;
const COL_CARRIED: usize = 5;
const COL_JOCKEY: usize = 6;
const COL_TIME: usize = 7;
const COL_LAST_3F: usize = 11;
const COL_ODDS: usize = 12;
const COL_POPULARITY: usize = 13;
const COL_WEIGHT: usize = 14;
const COL_TRAINER: usize = 18;
const COL_PRIZE: usize = 20;

/// Surface, direction and the rest of the conditions line
#[derive(Debug, Clone, PartialEq)]
pub struct CourseDescriptor {
    pub surface: CourseSurface,
    pub direction: CourseDirection,
    pub distance: u32,
    pub weather: String,
    pub condition: String,
}

/// Text of an element with each text node trimmed, like BeautifulSoup's strip
fn cell_text(elem: &ElementRef) -> String {
    elem.text().map(str::trim).collect::<String>()
}

/// Text nodes joined by single spaces, keeping `<br>`-separated values apart
fn spaced_text(elem: &ElementRef) -> String {
    elem.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first link in a cell, falling back to the whole cell
fn link_text(elem: &ElementRef) -> String {
    elem.select(&LINK)
        .next()
        .map(|a| cell_text(&a))
        .unwrap_or_else(|| cell_text(elem))
}

/// Parser for race result pages
pub struct RaceResultParser;

impl RaceResultParser {
    /// Whether the page carries a results table at all
    pub fn has_result_table(html: &str) -> bool {
        let document = Html::parse_document(html);
        let found = document.select(&RESULT_TABLE).next().is_some();
        found
    }

    /// Parse race result HTML
    ///
    /// Returns race info (with payouts) and the finishing entrants. Rows with
    /// a non-numeric rank are dropped.
    pub fn parse(
        html: &str,
        race_id: &RaceId,
    ) -> Result<(RaceInfo, Vec<EntrantResult>), CrawlError> {
        let document = Html::parse_document(html);

        let race_info = Self::parse_race_info(&document, race_id)?;

        let place = race_info
            .payout
            .as_ref()
            .and_then(|p| p.get(BetCategory::Place))
            .map(place_payouts)
            .unwrap_or_default();

        let entries = Self::parse_entries(&document, race_id, &place)?;

        Ok((race_info, entries))
    }

    fn parse_race_info(document: &Html, race_id: &RaceId) -> Result<RaceInfo, CrawlError> {
        let venue = venue_name(race_id.venue())?;

        let summary = document
            .select(&SUMMARY)
            .next()
            .map(|e| cell_text(&e))
            .ok_or_else(|| CrawlError::extraction("date", "summary line not found"))?;
        let date = Self::parse_date(&summary)?;

        let race_name = document
            .select(&RACE_NAME)
            .next()
            .map(|e| cell_text(&e))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CrawlError::extraction("race_name", "heading not found"))?;

        let conditions = document
            .select(&CONDITIONS)
            .next()
            .map(|e| e.text().collect::<String>())
            .ok_or_else(|| CrawlError::extraction("course", "conditions line not found"))?;
        let course = Self::parse_course(&conditions)?;

        let payout = Self::parse_payouts(document);
        if payout.is_none() {
            debug!(race_id = %race_id, "No payout tables on page");
        }

        Ok(RaceInfo {
            race_id: *race_id,
            date,
            venue: venue.to_string(),
            race_number: race_id.race(),
            race_name,
            surface: course.surface,
            direction: course.direction,
            distance: course.distance,
            weather: course.weather,
            condition: course.condition,
            payout,
        })
    }

    /// First `YYYY年M月D日` token in the summary line
    pub fn parse_date(text: &str) -> Result<NaiveDate, CrawlError> {
        let caps = DATE_RE
            .captures(text)
            .ok_or_else(|| CrawlError::extraction("date", format!("no date in {:?}", text)))?;

        let year: i32 = caps[1]
            .parse()
            .map_err(|_| CrawlError::extraction("date", "bad year"))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| CrawlError::extraction("date", "bad month"))?;
        let day: u32 = caps[3]
            .parse()
            .map_err(|_| CrawlError::extraction("date", "bad day"))?;

        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            CrawlError::extraction("date", format!("{}-{}-{} is not a date", year, month, day))
        })
    }

    /// Parse the `/`-separated conditions line, e.g.
    /// `芝右 外2500m / 天候 : 晴 / 芝 : 良 / 発走 : 15:40`
    pub fn parse_course(conditions: &str) -> Result<CourseDescriptor, CrawlError> {
        let cleaned = conditions.replace('\u{a0}', "");
        let segments: Vec<&str> = cleaned.split('/').collect();
        if segments.len() < 3 {
            return Err(CrawlError::extraction(
                "course",
                format!("expected 3 segments in {:?}", cleaned.trim()),
            ));
        }

        let head = segments[0];
        let surface = CourseSurface {
            turf: head.contains('芝'),
            dirt: head.contains('ダ'),
        };
        if !surface.turf && !surface.dirt {
            return Err(CrawlError::extraction(
                "course",
                format!("no surface in {:?}", head),
            ));
        }

        let direction = if head.contains('左') {
            CourseDirection::Left
        } else if head.contains('右') {
            CourseDirection::Right
        } else if head.contains('障') {
            CourseDirection::Jump
        } else if head.contains("直線") {
            CourseDirection::Straight
        } else {
            return Err(CrawlError::extraction(
                "course",
                format!("no direction in {:?}", head),
            ));
        };

        let distance = DISTANCE_RE
            .captures(head)
            .and_then(|caps| caps[1].parse().ok())
            .ok_or_else(|| CrawlError::extraction("course", format!("no distance in {:?}", head)))?;

        let weather = segments[1]
            .split_once(':')
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                CrawlError::extraction("weather", format!("no weather in {:?}", segments[1]))
            })?;

        let condition = (if surface.is_mixed() {
            MIXED_CONDITION_RE
                .captures(segments[2])
                .map(|caps| format!("{}/{}", &caps[1], &caps[2]))
        } else {
            segments[2]
                .split_once(':')
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .ok_or_else(|| {
            CrawlError::extraction("condition", format!("no condition in {:?}", segments[2]))
        })?;

        Ok(CourseDescriptor {
            surface,
            direction,
            distance,
            weather,
            condition,
        })
    }

    /// Scan every payout table for category markers. Missing categories stay
    /// empty; row order does not matter.
    fn parse_payouts(document: &Html) -> Option<PayoutTable> {
        let mut table = PayoutTable::default();

        for row in document.select(&PAYOUT_ROWS) {
            let Some(header) = row.select(&TH).next() else {
                continue;
            };
            let Some(category) = Self::payout_category(&header) else {
                debug!("Unknown payout row {:?}", cell_text(&header));
                continue;
            };
            if table.get(category).is_some() {
                warn!(category = category.label(), "Payout category listed twice, keeping first");
                continue;
            }

            let cells: Vec<_> = row.select(&TD).collect();
            if cells.len() < 2 {
                continue;
            }

            table.set(
                category,
                PayoutEntry {
                    combination: spaced_text(&cells[0]),
                    refund: normalize_amounts(&spaced_text(&cells[1])),
                    popularity: cells
                        .get(2)
                        .map(|c| normalize_amounts(&spaced_text(c)))
                        .unwrap_or_default(),
                },
            );
        }

        (!table.is_empty()).then_some(table)
    }

    fn payout_category(header: &ElementRef) -> Option<BetCategory> {
        let classes: Vec<&str> = header.value().classes().collect();
        let label = cell_text(header);

        BetCategory::ALL
            .into_iter()
            .find(|c| classes.contains(&c.marker_class()))
            .or_else(|| BetCategory::ALL.into_iter().find(|c| label == c.label()))
    }

    fn parse_entries(
        document: &Html,
        race_id: &RaceId,
        place: &[(u8, f64)],
    ) -> Result<Vec<EntrantResult>, CrawlError> {
        let table = document
            .select(&RESULT_TABLE)
            .next()
            .ok_or(CrawlError::NotFound)?;

        let entries = table
            .select(&ROW)
            .filter(|row| row.select(&TH).next().is_none())
            .filter_map(|row| Self::parse_entry_row(&row, race_id, place))
            .collect();

        Ok(entries)
    }

    fn parse_entry_row(
        row: &ElementRef,
        race_id: &RaceId,
        place: &[(u8, f64)],
    ) -> Option<EntrantResult> {
        let cells: Vec<_> = row.select(&TD).collect();

        if cells.len() <= COL_TRAINER {
            warn!(race_id = %race_id, cells = cells.len(), "Result row too short, skipping");
            return None;
        }

        let rank_text = cell_text(&cells[COL_RANK]);
        let Some(rank) = parse_rank(&rank_text) else {
            debug!(race_id = %race_id, rank = %rank_text, "Dropping abnormal finish");
            return None;
        };

        let Some(horse_number) = parse_int::<u8>(&cell_text(&cells[COL_NUMBER])) else {
            warn!(race_id = %race_id, rank, "Unreadable horse number, skipping row");
            return None;
        };

        let horse_id = cells[COL_HORSE]
            .select(&LINK)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| HORSE_ID_RE.captures(href).map(|caps| caps[1].to_string()));
        let Some(horse_id) = horse_id else {
            warn!(race_id = %race_id, horse_number, "No horse link, skipping row");
            return None;
        };

        let sex_age = cell_text(&cells[COL_SEX_AGE]);
        let mut sex_age_chars = sex_age.chars();
        let sex = sex_age_chars.next().and_then(Sex::from_char);
        let age = parse_int::<u8>(sex_age_chars.as_str());

        let raw_weight = cell_text(&cells[COL_WEIGHT]);
        let (horse_weight, weight_change) = match parse_horse_weight(&raw_weight) {
            Some((w, c)) => (Some(w), Some(c)),
            None => {
                debug!(race_id = %race_id, horse_number, raw = %raw_weight, "Unparsable horse weight");
                (None, None)
            }
        };

        Some(EntrantResult {
            race_id: *race_id,
            horse_id,
            rank,
            bracket: parse_int(&cell_text(&cells[COL_BRACKET])),
            horse_number,
            horse_name: link_text(&cells[COL_HORSE]),
            sex,
            age,
            jockey_weight: parse_decimal(&cell_text(&cells[COL_CARRIED])),
            jockey_name: link_text(&cells[COL_JOCKEY]),
            finish_time: to_seconds(&cell_text(&cells[COL_TIME])),
            last_3f: parse_decimal(&cell_text(&cells[COL_LAST_3F])),
            win_odds: parse_decimal(&cell_text(&cells[COL_ODDS])),
            popularity: parse_int(&cell_text(&cells[COL_POPULARITY])),
            horse_weight,
            weight_change,
            trainer_name: link_text(&cells[COL_TRAINER]),
            prize: cells.get(COL_PRIZE).and_then(|c| parse_decimal(&cell_text(c))),
            place_payout: match_place_payout(horse_number, place),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::historical::fixtures::{
        race_page, race_page_with, result_rows, MISSING_PAGE, MIXED_CONDITIONS, PAYOUT_TABLES,
        TURF_CONDITIONS,
    };

    fn race_id() -> RaceId {
        "202406050811".parse().unwrap()
    }

    #[test]
    fn test_has_result_table() {
        assert!(RaceResultParser::has_result_table(&race_page()));
        assert!(!RaceResultParser::has_result_table(MISSING_PAGE));
    }

    #[test]
    fn test_parse_race_info() {
        let (info, _) = RaceResultParser::parse(&race_page(), &race_id()).unwrap();

        assert_eq!(info.race_id, race_id());
        assert_eq!(info.date, NaiveDate::from_ymd_opt(2024, 12, 22).unwrap());
        assert_eq!(info.venue, "中山");
        assert_eq!(info.race_number, 11);
        assert_eq!(info.race_name, "有馬記念(G1)");
        assert_eq!(info.surface, CourseSurface { turf: true, dirt: false });
        assert_eq!(info.direction, CourseDirection::Right);
        assert_eq!(info.distance, 2500);
        assert_eq!(info.weather, "晴");
        assert_eq!(info.condition, "良");
    }

    #[test]
    fn test_parse_mixed_course() {
        let course = RaceResultParser::parse_course(MIXED_CONDITIONS).unwrap();
        assert_eq!(course.surface, CourseSurface { turf: true, dirt: true });
        assert_eq!(course.direction, CourseDirection::Jump);
        assert_eq!(course.distance, 3570);
        assert_eq!(course.weather, "曇");
        assert_eq!(course.condition, "稍重/重");
    }

    #[test]
    fn test_direction_priority() {
        let left = RaceResultParser::parse_course("ダ左1600m/天候 : 雨/ダート : 不良").unwrap();
        assert_eq!(left.direction, CourseDirection::Left);
        assert_eq!(left.surface, CourseSurface { turf: false, dirt: true });
        assert_eq!(left.condition, "不良");

        let straight = RaceResultParser::parse_course("芝直線1000m/天候 : 晴/芝 : 良").unwrap();
        assert_eq!(straight.direction, CourseDirection::Straight);

        // left wins over jump when both glyphs appear
        let jump_left = RaceResultParser::parse_course("障芝 左3000m/天候 : 晴/芝 : 良").unwrap();
        assert_eq!(jump_left.direction, CourseDirection::Left);
    }

    #[test]
    fn test_bad_course_is_fatal() {
        assert!(matches!(
            RaceResultParser::parse_course("芝右2500m"),
            Err(CrawlError::FatalExtraction { field: "course", .. })
        ));
        assert!(matches!(
            RaceResultParser::parse_course("芝右/天候 : 晴/芝 : 良"),
            Err(CrawlError::FatalExtraction { field: "course", .. })
        ));
        assert!(matches!(
            RaceResultParser::parse_course("障芝ダート3570m/天候 : 晴/芝 : 良"),
            Err(CrawlError::FatalExtraction { field: "condition", .. })
        ));
    }

    #[test]
    fn test_missing_date_is_fatal() {
        let html = race_page().replace("2024年12月22日", "");
        let result = RaceResultParser::parse(&html, &race_id());
        assert!(matches!(
            result,
            Err(CrawlError::FatalExtraction { field: "date", .. })
        ));
    }

    #[test]
    fn test_invalid_calendar_date_is_fatal() {
        assert!(RaceResultParser::parse_date("2024年2月30日 1回東京").is_err());
        assert_eq!(
            RaceResultParser::parse_date("1986年1月5日 1回中山1日目").unwrap(),
            NaiveDate::from_ymd_opt(1986, 1, 5).unwrap()
        );
    }

    #[test]
    fn test_parse_entries() {
        let (_, entries) = RaceResultParser::parse(&race_page(), &race_id()).unwrap();

        // the 中止 row is dropped
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let winner = &entries[0];
        assert_eq!(winner.race_id, race_id());
        assert_eq!(winner.horse_id, "2019105219");
        assert_eq!(winner.horse_name, "ドウデュース");
        assert_eq!(winner.bracket, Some(2));
        assert_eq!(winner.horse_number, 3);
        assert_eq!(winner.sex, Some(Sex::Colt));
        assert_eq!(winner.age, Some(5));
        assert_eq!(winner.jockey_weight, Some(58.0));
        assert_eq!(winner.jockey_name, "武豊");
        assert!((winner.finish_time.unwrap() - 151.8).abs() < 1e-9);
        assert_eq!(winner.last_3f, Some(33.1));
        assert_eq!(winner.win_odds, Some(2.1));
        assert_eq!(winner.popularity, Some(1));
        assert_eq!(winner.horse_weight, Some(504));
        assert_eq!(winner.weight_change, Some(2));
        assert_eq!(winner.trainer_name, "友道康夫");
        assert_eq!(winner.prize, Some(50000.0));
        assert_eq!(winner.place_payout, Some(1.1));

        let second = &entries[1];
        assert_eq!(second.sex, Some(Sex::Filly));
        assert_eq!(second.weight_change, Some(-4));
        assert_eq!(second.place_payout, Some(1.6));
    }

    #[test]
    fn test_unparsable_weight_keeps_row() {
        let (_, entries) = RaceResultParser::parse(&race_page(), &race_id()).unwrap();

        let third = &entries[2];
        assert_eq!(third.rank, 3);
        assert_eq!(third.horse_weight, None);
        assert_eq!(third.weight_change, None);
        assert_eq!(third.place_payout, Some(2.9));
    }

    #[test]
    fn test_parse_payouts_by_marker() {
        let (info, _) = RaceResultParser::parse(&race_page(), &race_id()).unwrap();
        let payout = info.payout.unwrap();

        let win = payout.get(BetCategory::Win).unwrap();
        assert_eq!(win.combination, "3");
        assert_eq!(win.refund, "210");
        assert_eq!(win.popularity, "1");

        let place = payout.get(BetCategory::Place).unwrap();
        assert_eq!(place.combination, "3 7 1");
        assert_eq!(place.refund, "110 160 290");

        // not on the page
        assert!(payout.get(BetCategory::BracketQuinella).is_none());

        let quinella = payout.get(BetCategory::Quinella).unwrap();
        assert_eq!(quinella.combination, "3 - 7");
        assert_eq!(quinella.refund, "1230");

        let wide = payout.get(BetCategory::QuinellaPlace).unwrap();
        assert_eq!(wide.refund, "450 700 1020");

        let tierce = payout.get(BetCategory::Tierce).unwrap();
        assert_eq!(tierce.combination, "3 → 7 → 1");
        assert_eq!(tierce.refund, "12340");
        assert_eq!(tierce.popularity, "25");
    }

    #[test]
    fn test_payout_row_order_does_not_matter() {
        let shuffled = r#"
<table class="pay_table_01">
<tr><th class="santan">三連単</th><td>3 → 7 → 1</td><td>12,340</td><td>25</td></tr>
<tr><th>複勝</th><td>3<br />7</td><td>150<br />210</td><td>1<br />3</td></tr>
</table>"#;
        let html = race_page_with(TURF_CONDITIONS, &result_rows(), shuffled);
        let (info, entries) = RaceResultParser::parse(&html, &race_id()).unwrap();

        let payout = info.payout.unwrap();
        assert!(payout.get(BetCategory::Win).is_none());
        assert_eq!(payout.get(BetCategory::Tierce).unwrap().refund, "12340");

        // horse 7 gets 2.10, horse 1 is not in the place list
        let by_number = |n: u8| entries.iter().find(|e| e.horse_number == n).unwrap();
        assert_eq!(by_number(7).place_payout, Some(2.1));
        assert_eq!(by_number(1).place_payout, None);
    }

    #[test]
    fn test_no_payout_tables() {
        let html = race_page_with(TURF_CONDITIONS, &result_rows(), "");
        let (info, entries) = RaceResultParser::parse(&html, &race_id()).unwrap();
        assert!(info.payout.is_none());
        assert!(entries.iter().all(|e| e.place_payout.is_none()));
    }

    #[test]
    fn test_mixed_course_page() {
        let html = race_page_with(MIXED_CONDITIONS, &result_rows(), PAYOUT_TABLES);
        let (info, _) = RaceResultParser::parse(&html, &race_id()).unwrap();
        assert!(info.surface.is_mixed());
        assert_eq!(info.condition, "稍重/重");
    }
}
