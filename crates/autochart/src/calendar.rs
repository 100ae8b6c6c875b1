// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Strict calendar label parsing shared by the merger's axis ordering and
//! the tooltip's time-axis detection.

use chrono::{NaiveDate, NaiveDateTime};

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];

/// Sort key of a calendar label. `year` is `None` for bare month names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarKey {
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
    pub seconds: u32,
}
impl CalendarKey {
    fn from_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            year: Some(date.year()),
            month: date.month(),
            day: date.day(),
            seconds: 0,
        }
    }
    fn from_datetime(dt: NaiveDateTime) -> Self {
        use chrono::Timelike;
        Self {
            seconds: dt.num_seconds_from_midnight(),
            ..Self::from_date(dt.date())
        }
    }
    /// Milliseconds since the Unix epoch, when the key carries a year.
    pub fn epoch_millis(&self) -> Option<i64> {
        let date = NaiveDate::from_ymd_opt(self.year?, self.month, self.day)?;
        let midnight = date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis();
        Some(midnight + i64::from(self.seconds) * 1000)
    }
}
pub fn parse_calendar_label(label: &str) -> Option<CalendarKey> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(label, format) {
            return Some(CalendarKey::from_datetime(dt));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(label, format) {
            return Some(CalendarKey::from_date(date));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d") {
        return Some(CalendarKey::from_date(date));
    }
    let mut parts = label.split_whitespace();
    let month = month_number(parts.next()?)?;
    let year = match parts.next() {
        None => None,
        Some(year) if year.len() == 4 => Some(year.parse::<i32>().ok()?),
        Some(_) => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(CalendarKey {
        year,
        month,
        day: 1,
        seconds: 0,
    })
}
/// Full month names or unambiguous prefixes of at least three letters.
fn month_number(token: &str) -> Option<u32> {
    let token = token.trim_end_matches('.').to_lowercase();
    if token.len() < 3 || !token.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    MONTHS
        .iter()
        .position(|name| name.starts_with(&token))
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_months_and_days() {
        let jan = parse_calendar_label("2025-01").unwrap();
        let jan_15 = parse_calendar_label("2025-01-15").unwrap();
        let feb = parse_calendar_label("2025/02/01").unwrap();
        assert!(jan < jan_15 && jan_15 < feb);
        assert_eq!(jan.epoch_millis(), Some(1_735_689_600_000));
    }

    #[test]
    fn parses_month_names() {
        assert_eq!(parse_calendar_label("Jan").unwrap().month, 1);
        assert_eq!(parse_calendar_label("sept").unwrap().month, 9);
        assert_eq!(parse_calendar_label("March 2024").unwrap().year, Some(2024));
        assert!(parse_calendar_label("Mar").unwrap().epoch_millis().is_none());
    }

    #[test]
    fn rejects_non_calendar_text() {
        for label in ["Project A", "ma", "2025-13", "Q1", "Jan 25", ""] {
            assert!(parse_calendar_label(label).is_none(), "{label}");
        }
    }
}
