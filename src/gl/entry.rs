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
use crate::util::date::Date;
use crate::util::quant::Quant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The account ledr's importer writes when it cannot guess a counterparty.
/// Postings carrying it are treated the same as postings with no account.
pub const PLACEHOLDER: &str = "Equity:PLACEHOLDER";

/// One transaction, either from the user's ledger history or freshly produced
/// by an importer. Entries handed to the predictor are never modified in
/// place; merging produces a new Entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Entry {
	date: Date,
	narration: String,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	payee: Option<String>,

	#[serde(default)]
	postings: Vec<Posting>,

	/// Annotations, e.g. ranked suggestions a human should look at
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	meta: BTreeMap<String, String>,
}

impl Entry {
	pub fn new(date: Date, narration: &str) -> Self {
		Self {
			date,
			narration: narration.to_string(),
			payee: None,
			postings: vec![],
			meta: BTreeMap::new(),
		}
	}

	pub fn with_payee(mut self, payee: &str) -> Self {
		self.payee = Some(payee.to_string());
		self
	}

	pub fn with_posting(mut self, posting: Posting) -> Self {
		self.postings.push(posting);
		self
	}

	pub fn date(&self) -> &Date {
		&self.date
	}

	pub fn narration(&self) -> &str {
		&self.narration
	}

	/// The payee, if one is present and not blank.
	pub fn payee(&self) -> Option<&str> {
		self.payee
			.as_deref()
			.map(str::trim)
			.filter(|p| !p.is_empty())
	}

	pub fn postings(&self) -> &[Posting] {
		&self.postings
	}

	pub fn meta(&self) -> &BTreeMap<String, String> {
		&self.meta
	}

	pub fn set_payee(&mut self, payee: &str) {
		self.payee = Some(payee.to_string());
	}

	pub fn add_posting(&mut self, posting: Posting) {
		self.postings.push(posting);
	}

	/// Replaces the account of the posting at `index`. Amount and currency
	/// are left exactly as they were.
	pub fn set_account(&mut self, index: usize, account: &str) {
		if let Some(posting) = self.postings.get_mut(index) {
			posting.account = Some(account.to_string());
		}
	}

	pub fn set_meta(&mut self, key: &str, value: String) {
		self.meta.insert(key.to_string(), value);
	}

	/// Indices of postings whose account still needs to be filled in.
	pub fn unresolved_postings(&self, placeholder: &str) -> Vec<usize> {
		self.postings
			.iter()
			.enumerate()
			.filter(|(_, p)| !p.is_resolved(placeholder))
			.map(|(i, _)| i)
			.collect()
	}

	/// Accounts of all postings that carry a real account, in posting order.
	pub fn resolved_accounts<'a>(
		&'a self,
		placeholder: &'a str,
	) -> impl Iterator<Item = &'a str> + 'a {
		self.postings
			.iter()
			.filter(move |p| p.is_resolved(placeholder))
			.filter_map(|p| p.account())
	}

	/// True iff every posting carries a real account.
	pub fn is_fully_resolved(&self, placeholder: &str) -> bool {
		!self.postings.is_empty()
			&& self.postings.iter().all(|p| p.is_resolved(placeholder))
	}

	/// Renders like Display, but writes `placeholder` on postings without an
	/// account.
	pub fn display<'a>(&'a self, placeholder: &'a str) -> Rendered<'a> {
		Rendered {
			entry: self,
			placeholder,
		}
	}
}

impl fmt::Display for Entry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.display(PLACEHOLDER))
	}
}

/// Ledger text of an Entry, with a chosen account written on postings that
/// have none. Returned by `Entry::display`.
pub struct Rendered<'a> {
	entry: &'a Entry,
	placeholder: &'a str,
}

impl fmt::Display for Rendered<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let entry = self.entry;

		// Render the header line with date, payee if any, and narration
		match entry.payee() {
			Some(payee) => writeln!(f, "{} {} | {}", entry.date, payee, entry.narration)?,
			None => writeln!(f, "{} {}", entry.date, entry.narration)?,
		}

		for (key, value) in &entry.meta {
			writeln!(f, "\t// {}: {}", key, value)?;
		}

		if entry.postings.is_empty() {
			return Ok(());
		}

		let accounts: Vec<&str> = entry
			.postings
			.iter()
			.map(|p| p.account().unwrap_or(self.placeholder))
			.collect();
		let values: Vec<String> = entry
			.postings
			.iter()
			.map(|p| p.amount.map(|a| a.to_string()).unwrap_or_default())
			.collect();

		// Calculate the maximum widths so amounts line up
		let account_width = accounts.iter().map(|a| a.len()).max().unwrap_or(0);
		let value_width = values.iter().map(|v| v.len()).max().unwrap_or(0);

		for ((posting, account), value) in
			entry.postings.iter().zip(accounts).zip(values)
		{
			if posting.amount.is_none() {
				writeln!(f, "\t{}", account)?;
				continue;
			}

			let line = format!(
				"\t{:<account_width$}  {:>value_width$} {}",
				account,
				value,
				posting.currency.as_deref().unwrap_or(""),
				account_width = account_width,
				value_width = value_width
			);
			writeln!(f, "{}", line.trim_end())?;
		}

		Ok(())
	}
}

/// A specific line item in an Entry. Anything but the account may be absent,
/// and so may the account itself on entries fresh from an importer.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Posting {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	account: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	amount: Option<Quant>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	currency: Option<String>,
}

impl Posting {
	pub fn new(account: &str, amount: Quant, currency: &str) -> Self {
		Self {
			account: Some(account.to_string()),
			amount: Some(amount),
			currency: Some(currency.to_string()),
		}
	}

	/// A posting with an account but no amount, left for the ledger to
	/// balance.
	pub fn account_only(account: &str) -> Self {
		Self {
			account: Some(account.to_string()),
			..Default::default()
		}
	}

	/// A posting the importer could not attribute to any account.
	pub fn unresolved(amount: Option<Quant>, currency: Option<&str>) -> Self {
		Self {
			account: None,
			amount,
			currency: currency.map(str::to_string),
		}
	}

	/// The account, unless it is absent or blank.
	pub fn account(&self) -> Option<&str> {
		self.account
			.as_deref()
			.map(str::trim)
			.filter(|a| !a.is_empty())
	}

	pub fn amount(&self) -> Option<&Quant> {
		self.amount.as_ref()
	}

	pub fn currency(&self) -> Option<&str> {
		self.currency.as_deref()
	}

	pub fn is_resolved(&self, placeholder: &str) -> bool {
		matches!(self.account(), Some(a) if a != placeholder)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn create_entry() -> Entry {
		Entry::new(Date::from_str("2024-01-05").unwrap(), "COFFEE SHOP")
			.with_posting(Posting::unresolved(
				Some(Quant::from_str("4.50").unwrap()),
				Some("USD"),
			))
			.with_posting(Posting::new(
				"Assets:Checking",
				Quant::from_str("-4.50").unwrap(),
				"USD",
			))
	}

	#[test]
	fn test_unresolved_postings() {
		let entry = create_entry();
		assert_eq!(entry.unresolved_postings(PLACEHOLDER), vec![0]);
		assert!(!entry.is_fully_resolved(PLACEHOLDER));
		assert_eq!(
			entry.resolved_accounts(PLACEHOLDER).collect::<Vec<_>>(),
			vec!["Assets:Checking"]
		);
	}

	#[test]
	fn test_placeholder_and_blank_accounts_are_unresolved() {
		let entry = Entry::new(Date::from_str("2024-01-05").unwrap(), "x")
			.with_posting(Posting::account_only(PLACEHOLDER))
			.with_posting(Posting::account_only("  "))
			.with_posting(Posting::account_only("Assets:Cash"));
		assert_eq!(entry.unresolved_postings(PLACEHOLDER), vec![0, 1]);
	}

	#[test]
	fn test_blank_payee_is_absent() {
		let entry = create_entry().with_payee("   ");
		assert_eq!(entry.payee(), None);
		let entry = create_entry().with_payee(" Blue Bottle ");
		assert_eq!(entry.payee(), Some("Blue Bottle"));
	}

	#[test]
	fn test_set_account_keeps_amount() {
		let mut entry = create_entry();
		entry.set_account(0, "Expenses:Dining");
		let posting = &entry.postings()[0];
		assert_eq!(posting.account(), Some("Expenses:Dining"));
		assert_eq!(posting.amount().unwrap().to_string(), "4.50");
		assert_eq!(posting.currency(), Some("USD"));
		assert!(entry.is_fully_resolved(PLACEHOLDER));
	}

	#[test]
	fn test_display_renders_placeholder_and_alignment() {
		let entry = create_entry();
		let expected = "2024-01-05 COFFEE SHOP\n\
			\tEquity:PLACEHOLDER   4.50 USD\n\
			\tAssets:Checking     -4.50 USD\n";
		assert_eq!(entry.to_string(), expected);
	}

	#[test]
	fn test_display_with_configured_placeholder() {
		let entry = create_entry();
		let expected = "2024-01-05 COFFEE SHOP\n\
			\tExpenses:Unknown   4.50 USD\n\
			\tAssets:Checking   -4.50 USD\n";
		assert_eq!(entry.display("Expenses:Unknown").to_string(), expected);
	}

	#[test]
	fn test_display_with_payee_meta_and_bare_posting() {
		let mut entry = create_entry().with_payee("Blue Bottle");
		entry.add_posting(Posting::account_only("Expenses:Tips"));
		entry.set_meta("__suggested_accounts__", "[\"Expenses:Dining\"]".into());
		let rendered = entry.to_string();
		assert!(rendered.starts_with("2024-01-05 Blue Bottle | COFFEE SHOP\n"));
		assert!(rendered
			.contains("\t// __suggested_accounts__: [\"Expenses:Dining\"]\n"));
		assert!(rendered.ends_with("\tExpenses:Tips\n"));
	}

	#[test]
	fn test_deserialize_sparse_json() {
		let json = r#"{
			"date": "2024-02-01",
			"narration": "RENT PAYMENT",
			"postings": [{"amount": 1200, "currency": "USD"}, {"account": "Assets:Checking"}]
		}"#;
		let entry: Entry = serde_json::from_str(json).unwrap();
		assert_eq!(entry.payee(), None);
		assert_eq!(entry.postings().len(), 2);
		assert_eq!(entry.unresolved_postings(PLACEHOLDER), vec![0]);
		assert!(entry.meta().is_empty());
	}
}
