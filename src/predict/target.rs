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
use crate::gl::entry::Entry;
use crate::predict::error::PredictError;
use crate::predict::options::Options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const METADATA_KEY_SUGGESTED_ACCOUNTS: &str = "__suggested_accounts__";
pub const METADATA_KEY_SUGGESTED_PAYEES: &str = "__suggested_payees__";

/// Which field of an entry a pipeline run predicts.
#[derive(
	Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
	/// The counter-account of the posting(s) the importer could not resolve
	Account,
	Payee,
}

impl TargetKind {
	pub const ALL: [TargetKind; 2] = [TargetKind::Account, TargetKind::Payee];

	pub fn from_str(s: &str) -> Result<Self, PredictError> {
		match s.trim().to_ascii_lowercase().as_str() {
			"account" | "accounts" => Ok(TargetKind::Account),
			"payee" | "payees" => Ok(TargetKind::Payee),
			_ => Err(PredictError::Configuration(format!(
				"unknown target kind: {}",
				s
			))),
		}
	}

	/// Metadata key under which ranked suggestions are attached.
	pub fn suggestion_key(&self) -> &'static str {
		match self {
			TargetKind::Account => METADATA_KEY_SUGGESTED_ACCOUNTS,
			TargetKind::Payee => METADATA_KEY_SUGGESTED_PAYEES,
		}
	}

	/// The text fields that feed features, each with the prefix its terms
	/// are namespaced under. The payee is the label when predicting payees,
	/// so it cannot also be a feature there.
	pub fn text_fields<'a>(&self, entry: &'a Entry) -> Vec<(&'static str, &'a str)> {
		match self {
			TargetKind::Account => {
				let mut fields = vec![("n", entry.narration())];
				if let Some(payee) = entry.payee() {
					fields.push(("p", payee));
				}
				fields
			},
			TargetKind::Payee => vec![("n", entry.narration())],
		}
	}

	/// The account a candidate's features are conditioned on. Only accounts
	/// are predicted relative to one.
	pub fn reference<'e>(&self, entry: &'e Entry, scope: &Scope) -> Option<&'e str> {
		match self {
			TargetKind::Account => scope.reference_account(entry),
			TargetKind::Payee => None,
		}
	}

	/// True iff the candidate has something for this target kind to fill.
	pub fn needs(&self, entry: &Entry, scope: &Scope) -> bool {
		match self {
			TargetKind::Account => !scope.account_slots(entry).is_empty(),
			TargetKind::Payee => {
				entry.payee().is_none() || scope.options.allow_override
			},
		}
	}
}

impl fmt::Display for TargetKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TargetKind::Account => write!(f, "account"),
			TargetKind::Payee => write!(f, "payee"),
		}
	}
}

/// Where on an entry a predicted account goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountSlots {
	/// Postings whose account gets replaced
	pub postings: Vec<usize>,
	/// Whether a new amount-less posting gets appended
	pub append: bool,
}

impl AccountSlots {
	pub fn is_empty(&self) -> bool {
		self.postings.is_empty() && !self.append
	}

	pub fn len(&self) -> usize {
		self.postings.len() + usize::from(self.append)
	}
}

/// Per-run view of the options. Built once per run, shared read-only across
/// target kinds. Nothing in it depends on the candidates, so an entry's
/// predictions never depend on which other entries share its batch.
#[derive(Debug)]
pub struct Scope<'a> {
	pub options: &'a Options,

	/// Accounts the import layer fills in by itself. They anchor candidates
	/// and are never predicted.
	pub known_accounts: BTreeSet<String>,
}

impl<'a> Scope<'a> {
	pub fn new(options: &'a Options) -> Self {
		Self {
			options,
			known_accounts: options.known_accounts.iter().cloned().collect(),
		}
	}

	pub fn placeholder(&self) -> &str {
		&self.options.placeholder_account
	}

	pub fn is_known(&self, account: &str) -> bool {
		self.known_accounts.contains(account)
	}

	/// The posting an entry was imported against: the first resolved posting
	/// in a known account, or failing that the first resolved posting.
	pub fn reference_posting(&self, entry: &Entry) -> Option<usize> {
		let placeholder = self.placeholder();
		let resolved: Vec<(usize, &str)> = entry
			.postings()
			.iter()
			.enumerate()
			.filter(|(_, p)| p.is_resolved(placeholder))
			.filter_map(|(i, p)| p.account().map(|a| (i, a)))
			.collect();

		resolved
			.iter()
			.find(|(_, a)| self.is_known(a))
			.or(resolved.first())
			.map(|(i, _)| *i)
	}

	pub fn reference_account<'e>(&self, entry: &'e Entry) -> Option<&'e str> {
		self.reference_posting(entry)
			.and_then(|i| entry.postings()[i].account())
	}

	/// Works out which postings a predicted account may be written to.
	/// Without override, only unresolved postings qualify. With override,
	/// resolved postings outside the known accounts qualify as well, but only
	/// on entries anchored by at least one known account, since otherwise
	/// there is no telling which side the importer supplied.
	pub fn account_slots(&self, entry: &Entry) -> AccountSlots {
		let placeholder = self.placeholder();
		let mut postings = entry.unresolved_postings(placeholder);

		if self.options.allow_override {
			let anchored = entry.resolved_accounts(placeholder).any(|a| self.is_known(a));
			if anchored {
				for (i, posting) in entry.postings().iter().enumerate() {
					match posting.account() {
						Some(a) if posting.is_resolved(placeholder) && !self.is_known(a) => {
							postings.push(i)
						},
						_ => {},
					}
				}
				postings.sort_unstable();
			}
		}

		let append = self.options.add_counter_posting
			&& entry.postings().len() == 1
			&& postings.is_empty();

		AccountSlots { postings, append }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gl::entry::Posting;
	use crate::util::date::Date;

	fn entry(postings: Vec<Posting>) -> Entry {
		let mut e = Entry::new(Date::from_str("2024-03-01").unwrap(), "COFFEE SHOP");
		for p in postings {
			e.add_posting(p);
		}
		e
	}

	#[test]
	fn test_from_str() {
		assert_eq!(TargetKind::from_str("Account").unwrap(), TargetKind::Account);
		assert_eq!(TargetKind::from_str(" payees").unwrap(), TargetKind::Payee);
		assert!(TargetKind::from_str("narration").is_err());
	}

	#[test]
	fn test_known_accounts_are_only_configured_ones() {
		let options = Options {
			known_accounts: vec!["Assets:Savings".into()],
			..Default::default()
		};
		let scope = Scope::new(&options);
		assert!(scope.is_known("Assets:Savings"));
		assert!(!scope.is_known("Assets:Checking"));
	}

	#[test]
	fn test_reference_posting() {
		let options = Options {
			known_accounts: vec!["Assets:Checking".into()],
			..Default::default()
		};
		let scope = Scope::new(&options);

		let anchored = entry(vec![
			Posting::account_only("Expenses:Manual"),
			Posting::unresolved(None, None),
			Posting::account_only("Assets:Checking"),
		]);
		assert_eq!(scope.reference_posting(&anchored), Some(2));
		assert_eq!(
			TargetKind::Account.reference(&anchored, &scope),
			Some("Assets:Checking")
		);
		assert_eq!(TargetKind::Payee.reference(&anchored, &scope), None);

		let card = entry(vec![
			Posting::unresolved(None, None),
			Posting::account_only("Equity:PLACEHOLDER"),
			Posting::account_only("Liabilities:Card"),
		]);
		assert_eq!(scope.reference_account(&card), Some("Liabilities:Card"));

		let bare = entry(vec![Posting::unresolved(None, None)]);
		assert_eq!(scope.reference_posting(&bare), None);
	}

	#[test]
	fn test_account_slots_without_override() {
		let options = Options::default();
		let candidate = entry(vec![
			Posting::unresolved(None, None),
			Posting::account_only("Assets:Checking"),
		]);
		let scope = Scope::new(&options);
		let slots = scope.account_slots(&candidate);
		assert_eq!(slots.postings, vec![0]);
		assert!(!slots.append);
		assert!(TargetKind::Account.needs(&candidate, &scope));

		let resolved = entry(vec![
			Posting::account_only("Expenses:Manual"),
			Posting::account_only("Assets:Checking"),
		]);
		assert!(scope.account_slots(&resolved).is_empty());
		assert!(!TargetKind::Account.needs(&resolved, &scope));
	}

	#[test]
	fn test_account_slots_lone_posting_appends() {
		let options = Options::default();
		let candidate = entry(vec![Posting::account_only("Assets:Checking")]);
		let scope = Scope::new(&options);
		let slots = scope.account_slots(&candidate);
		assert!(slots.postings.is_empty());
		assert!(slots.append);
		assert_eq!(slots.len(), 1);

		let options = Options {
			add_counter_posting: false,
			..Default::default()
		};
		let scope = Scope::new(&options);
		assert!(scope.account_slots(&candidate).is_empty());
	}

	#[test]
	fn test_account_slots_with_override() {
		let options = Options {
			allow_override: true,
			known_accounts: vec!["Assets:Checking".into()],
			..Default::default()
		};
		let anchored = entry(vec![
			Posting::account_only("Expenses:Manual"),
			Posting::account_only("Assets:Checking"),
		]);
		let scope = Scope::new(&options);
		assert_eq!(scope.account_slots(&anchored).postings, vec![0]);

		let unanchored = entry(vec![
			Posting::account_only("Expenses:Manual"),
			Posting::account_only("Assets:Card"),
		]);
		assert!(scope.account_slots(&unanchored).is_empty());
	}

	#[test]
	fn test_payee_needs() {
		let options = Options::default();
		let scope = Scope::new(&options);
		let without = entry(vec![]);
		let with = entry(vec![]).with_payee("Blue Bottle");
		assert!(TargetKind::Payee.needs(&without, &scope));
		assert!(!TargetKind::Payee.needs(&with, &scope));

		let options = Options {
			allow_override: true,
			..Default::default()
		};
		let scope = Scope::new(&options);
		assert!(TargetKind::Payee.needs(&with, &scope));
	}

	#[test]
	fn test_text_fields() {
		let e = entry(vec![]).with_payee("Blue Bottle");
		assert_eq!(
			TargetKind::Account.text_fields(&e),
			vec![("n", "COFFEE SHOP"), ("p", "Blue Bottle")]
		);
		assert_eq!(TargetKind::Payee.text_fields(&e), vec![("n", "COFFEE SHOP")]);
	}
}
