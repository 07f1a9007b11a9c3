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
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An exact decimal quantity as it appeared in the imported data. Predictions
/// never do arithmetic on amounts, so this only needs to parse and render
/// faithfully: a value renders with exactly as many decimal places and the
/// same sign as it was written with, so `-0.00` stays `-0.00`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Quant {
	negative: bool,

	/// Absolute value scaled by 10^render_precision.
	magnitude: u128,

	/// Number of decimal places the value was written with.
	render_precision: u32,
}

impl Quant {
	/// Creates a new Quant as though a decimal point were inserted `exp`
	/// places from the right of `numerator`.
	pub fn new(numerator: i128, exp: u32) -> Self {
		Self {
			negative: numerator < 0,
			magnitude: numerator.unsigned_abs(),
			render_precision: exp,
		}
	}

	pub fn from_str(input: &str) -> Result<Self, Error> {
		let input = input.trim();

		// Check for a sign explicitly and remove it for parsing
		let (negative, sanitized) = match input.strip_prefix('-') {
			Some(rest) => (true, rest),
			None => (false, input.strip_prefix('+').unwrap_or(input)),
		};
		if sanitized.is_empty() {
			bail!("Invalid decimal format: {:?}", input);
		}

		let parts: Vec<&str> = sanitized.split('.').collect();
		let (magnitude, precision) = match parts.len() {
			1 => (parse_digits(parts[0])?, 0),
			2 if parts[0].is_empty() && parts[1].is_empty() => {
				bail!("Invalid decimal format: {:?}", input)
			},
			2 => {
				let whole = if parts[0].is_empty() {
					0
				} else {
					parse_digits(parts[0])?
				};
				let decimal = parts[1];
				let precision = decimal.len() as u32;
				let scale = checked_scale(precision)?;
				let fractional = if decimal.is_empty() {
					0
				} else {
					parse_digits(decimal)?
				};
				let magnitude = whole
					.checked_mul(scale)
					.and_then(|n| n.checked_add(fractional))
					.ok_or_else(|| {
						anyhow::anyhow!("Decimal out of range: {}", input)
					})?;
				(magnitude, precision)
			},
			_ => bail!("Invalid decimal format: {:?}", input),
		};

		Ok(Self {
			negative,
			magnitude,
			render_precision: precision,
		})
	}
}

fn parse_digits(s: &str) -> Result<u128, Error> {
	if !s.chars().all(|c| c.is_ascii_digit()) {
		bail!("Invalid decimal digits: {:?}", s);
	}
	Ok(s.parse::<u128>()?)
}

fn checked_scale(precision: u32) -> Result<u128, Error> {
	match 10u128.checked_pow(precision) {
		Some(scale) => Ok(scale),
		None => bail!("Too many decimal places: {}", precision),
	}
}

impl fmt::Display for Quant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let sign = if self.negative { "-" } else { "" };
		let digits = self.magnitude.to_string();
		let precision = self.render_precision as usize;

		if precision == 0 {
			return write!(f, "{}{}", sign, digits);
		}

		// Left-pad so there is always at least one integer digit
		let padded = format!("{:0>width$}", digits, width = precision + 1);
		let (int_str, fraction_str) = padded.split_at(padded.len() - precision);
		write!(f, "{}{}.{}", sign, int_str, fraction_str)
	}
}

impl Serialize for Quant {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

/// Accepts either a decimal string or a JSON number, since bank exports and
/// hand-written batches disagree on which to use. serde_json is built with
/// `arbitrary_precision`, so a number arrives as the text it was written as
/// and keeps its trailing zeros. Exponent notation is rejected.
impl<'de> Deserialize<'de> for Quant {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = serde_json::Value::deserialize(deserializer)?;
		let text = match value {
			serde_json::Value::Number(num) => num.to_string(),
			serde_json::Value::String(s) => s,
			_ => return Err(serde::de::Error::custom("expected a decimal")),
		};
		Quant::from_str(&text).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_str_preserves_written_precision() {
		let q = Quant::from_str("4.50").unwrap();
		assert_eq!(q, Quant::new(450, 2));
		assert_eq!(q.to_string(), "4.50");
	}

	#[test]
	fn test_from_str_negative() {
		let q = Quant::from_str("-0.05").unwrap();
		assert_eq!(q, Quant::new(-5, 2));
		assert_eq!(q.to_string(), "-0.05");
		assert_eq!(Quant::from_str("+7.1").unwrap().to_string(), "7.1");
	}

	#[test]
	fn test_negative_zero_keeps_its_sign() {
		let q = Quant::from_str("-0.00").unwrap();
		assert_eq!(q.to_string(), "-0.00");
		assert_ne!(q, Quant::from_str("0.00").unwrap());
		assert_eq!(Quant::new(0, 2).to_string(), "0.00");
	}

	#[test]
	fn test_from_str_integer() {
		let q = Quant::from_str("1200").unwrap();
		assert_eq!(q.to_string(), "1200");
	}

	#[test]
	fn test_from_str_rejects_garbage() {
		assert!(Quant::from_str("").is_err());
		assert!(Quant::from_str("-").is_err());
		assert!(Quant::from_str("1.2.3").is_err());
		assert!(Quant::from_str("12a").is_err());
		assert!(Quant::from_str("1,000").is_err());
		assert!(Quant::from_str("--5").is_err());
		assert!(Quant::from_str(".").is_err());
	}

	#[test]
	fn test_deserialize_number_and_string() {
		let from_number: Quant = serde_json::from_str("12.25").unwrap();
		let from_string: Quant = serde_json::from_str("\"-3.10\"").unwrap();
		assert_eq!(from_number.to_string(), "12.25");
		assert_eq!(from_string.to_string(), "-3.10");
		assert!(serde_json::from_str::<Quant>("true").is_err());

		let trailing: Quant = serde_json::from_str("4.50").unwrap();
		assert_eq!(trailing.to_string(), "4.50");
		let zero: Quant = serde_json::from_str("-0.00").unwrap();
		assert_eq!(zero.to_string(), "-0.00");
	}
}
