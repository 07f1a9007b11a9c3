/* Copyright © 2024-2025 Adam Train <adam@trainrelay.net>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */
use anyhow::{bail, Error};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A calendar date. Field order makes the derived ordering chronological.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
	year: u32,
	month: u8,
	day: u8,
}

impl Date {
	/// Constructor to parse a string in the "YYYY-mm-dd" format
	pub fn from_str(date_str: &str) -> Result<Date, Error> {
		let parts: Vec<&str> = date_str.trim().split('-').collect();
		if parts.len() != 3 {
			bail!("Date format must be YYYY-MM-DD");
		}

		let year = parts[0].parse::<u32>()?;
		let month = parts[1].parse::<u8>()?;
		let day = parts[2].parse::<u8>()?;

		// Validate the date
		if !Date::is_valid_date(year, month, day) {
			bail!("Invalid date: {}", date_str);
		}

		Ok(Date { year, month, day })
	}

	pub fn day(&self) -> u8 {
		self.day
	}

	/// Day of the week, computed through chrono. Every Date that passed
	/// validation is representable there; the fallback is unreachable in
	/// practice but keeps this infallible.
	pub fn weekday(&self) -> Weekday {
		NaiveDate::from_ymd_opt(
			self.year as i32,
			self.month as u32,
			self.day as u32,
		)
		.map(|d| d.weekday())
		.unwrap_or(Weekday::Mon)
	}

	fn is_leap_year(year: u32) -> bool {
		(year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
	}

	fn days_in_month(year: u32, month: u8) -> u8 {
		match month {
			1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
			4 | 6 | 9 | 11 => 30,
			2 => {
				if Date::is_leap_year(year) {
					29
				} else {
					28
				}
			},
			_ => 0, // Invalid month
		}
	}

	fn is_valid_date(year: u32, month: u8, day: u8) -> bool {
		if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
			return false;
		}
		if day < 1 || day > Date::days_in_month(year, month) {
			return false;
		}
		true
	}
}

impl fmt::Display for Date {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
	}
}

impl Serialize for Date {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Date {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		Date::from_str(&s).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_str_round_trips_through_display() {
		let date = Date::from_str("2024-3-7").unwrap();
		assert_eq!(date.to_string(), "2024-03-07");
		assert_eq!(date.day(), 7);
	}

	#[test]
	fn test_invalid_dates() {
		assert!(Date::from_str("2024-02-30").is_err());
		assert!(Date::from_str("2023-02-29").is_err());
		assert!(Date::from_str("2024-13-01").is_err());
		assert!(Date::from_str("2024/01/01").is_err());
		assert!(Date::from_str("0-01-01").is_err());
	}

	#[test]
	fn test_leap_day() {
		assert!(Date::from_str("2024-02-29").is_ok());
		assert!(Date::from_str("2000-02-29").is_ok());
		assert!(Date::from_str("1900-02-29").is_err());
	}

	#[test]
	fn test_weekday() {
		assert_eq!(Date::from_str("2024-11-15").unwrap().weekday(), Weekday::Fri);
		assert_eq!(Date::from_str("2000-01-01").unwrap().weekday(), Weekday::Sat);
	}

	#[test]
	fn test_ordering() {
		let a = Date::from_str("2023-12-31").unwrap();
		let b = Date::from_str("2024-01-01").unwrap();
		assert!(a < b);
	}

	#[test]
	fn test_serde_as_string() {
		let date: Date = serde_json::from_str("\"2024-05-01\"").unwrap();
		assert_eq!(serde_json::to_string(&date).unwrap(), "\"2024-05-01\"");
		assert!(serde_json::from_str::<Date>("\"2024-05-32\"").is_err());
	}
}
