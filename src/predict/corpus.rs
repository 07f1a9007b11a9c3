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
use crate::predict::features::{Document, Tokenizer};
use crate::predict::target::{Scope, TargetKind};
use std::collections::BTreeSet;
use tracing::debug;

/// One labeled example: the text of a historical entry and one value it
/// resolved the target to. The feature vector is derived from the document
/// once the run's vocabulary is fitted.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingExample {
	pub document: Document,
	pub label: String,
}

/// The labeled examples for one target kind.
#[derive(Clone, Debug)]
pub struct Corpus {
	pub kind: TargetKind,
	pub examples: Vec<TrainingExample>,
}

impl Corpus {
	/// Selects the usable part of the history and labels it.
	///
	/// For accounts, an entry's references are its postings in known
	/// accounts, or every posting when it has none. Each reference paired
	/// with each other account that is not known yields an example whose
	/// document carries the reference. One entry may contribute several.
	/// Entries with any unresolved posting contribute nothing: they would
	/// teach the model its own gaps. For payees, each entry with a payee
	/// yields one example.
	///
	/// Fails with InsufficientData when fewer distinct labels than the
	/// configured minimum remain.
	pub fn build(
		history: &[Entry],
		kind: TargetKind,
		scope: &Scope,
		tokenizer: &Tokenizer,
	) -> Result<Self, PredictError> {
		let mut examples = vec![];
		let mut skipped = 0;

		for (index, entry) in history.iter().enumerate() {
			let labeled = Corpus::labels_of(entry, kind, scope);
			if labeled.is_empty() {
				continue;
			}

			for (reference, label) in labeled {
				match tokenizer.document(entry, kind, reference, index) {
					Ok(document) => examples.push(TrainingExample {
						document,
						label: label.to_string(),
					}),
					Err(_) => {
						skipped += 1;
						break;
					},
				}
			}
		}

		let corpus = Self { kind, examples };
		let distinct = corpus.labels().len();
		debug!(
			"{} corpus: {} examples, {} distinct labels, {} history entries without text",
			kind,
			corpus.examples.len(),
			distinct,
			skipped
		);

		let required = scope.options.min_distinct_labels;
		if distinct < required {
			return Err(PredictError::InsufficientData {
				kind,
				distinct,
				required,
			});
		}

		Ok(corpus)
	}

	/// The (reference, label) pairs a historical entry resolved for the
	/// target kind.
	fn labels_of<'e>(
		entry: &'e Entry,
		kind: TargetKind,
		scope: &Scope,
	) -> Vec<(Option<&'e str>, &'e str)> {
		match kind {
			TargetKind::Account => {
				let placeholder = scope.placeholder();
				if !entry.is_fully_resolved(placeholder) {
					return vec![];
				}

				let accounts: Vec<&str> =
					entry.postings().iter().filter_map(|p| p.account()).collect();
				if let Some(filter) = &scope.options.training_account {
					if !accounts.contains(&filter.as_str()) {
						return vec![];
					}
				}

				let known: Vec<&str> =
					accounts.iter().copied().filter(|a| scope.is_known(a)).collect();
				let references = if known.is_empty() { &accounts } else { &known };

				let mut pairs = vec![];
				for &reference in references {
					for &label in &accounts {
						let pair = (Some(reference), label);
						if label != reference && !scope.is_known(label) && !pairs.contains(&pair) {
							pairs.push(pair);
						}
					}
				}
				pairs
			},
			TargetKind::Payee => entry.payee().map(|p| vec![(None, p)]).unwrap_or_default(),
		}
	}

	/// Distinct labels, sorted.
	pub fn labels(&self) -> BTreeSet<&str> {
		self.examples.iter().map(|e| e.label.as_str()).collect()
	}

	pub fn len(&self) -> usize {
		self.examples.len()
	}

	pub fn is_empty(&self) -> bool {
		self.examples.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gl::entry::Posting;
	use crate::predict::options::Options;
	use crate::util::date::Date;

	fn entry(narration: &str, accounts: &[&str]) -> Entry {
		let mut e = Entry::new(Date::from_str("2024-01-10").unwrap(), narration);
		for a in accounts {
			e.add_posting(Posting::account_only(a));
		}
		e
	}

	fn history() -> Vec<Entry> {
		vec![
			entry("COFFEE SHOP", &["Expenses:Dining", "Assets:Checking"]),
			entry("COFFEE SHOP", &["Expenses:Dining", "Assets:Checking"]),
			entry("RENT PAYMENT", &["Expenses:Rent", "Assets:Checking"]),
		]
	}

	fn checking() -> Options {
		Options {
			known_accounts: vec!["Assets:Checking".into()],
			..Default::default()
		}
	}

	#[test]
	fn test_account_corpus_excludes_known_accounts() {
		let options = checking();
		let scope = Scope::new(&options);
		let tokenizer = Tokenizer::new(1, false).unwrap();

		let corpus =
			Corpus::build(&history(), TargetKind::Account, &scope, &tokenizer).unwrap();
		assert_eq!(corpus.len(), 3);
		assert_eq!(
			corpus.labels().into_iter().collect::<Vec<_>>(),
			vec!["Expenses:Dining", "Expenses:Rent"]
		);
		assert!(corpus
			.examples
			.iter()
			.all(|e| e.document.terms().contains(&"r:assets_checking".to_string())));
	}

	#[test]
	fn test_multi_posting_entry_yields_one_example_per_account() {
		let options = checking();
		let scope = Scope::new(&options);
		let tokenizer = Tokenizer::new(1, false).unwrap();
		let history = vec![
			entry("PAYROLL", &["Income:Salary", "Expenses:Taxes", "Assets:Checking"]),
			entry("GROCER", &["Expenses:Groceries", "Assets:Checking"]),
		];

		let corpus =
			Corpus::build(&history, TargetKind::Account, &scope, &tokenizer).unwrap();
		assert_eq!(corpus.len(), 3);
		let payroll: Vec<_> = corpus
			.examples
			.iter()
			.filter(|e| e.document.terms() == ["n:payroll", "r:assets_checking"])
			.map(|e| e.label.as_str())
			.collect();
		assert_eq!(payroll, vec!["Income:Salary", "Expenses:Taxes"]);
	}

	#[test]
	fn test_without_known_accounts_every_posting_is_a_reference() {
		let options = Options::default();
		let scope = Scope::new(&options);
		let tokenizer = Tokenizer::new(1, false).unwrap();
		let history = vec![
			entry("COFFEE SHOP", &["Expenses:Dining", "Liabilities:Card"]),
			entry("COFFEE SHOP", &["Expenses:Dining", "Expenses:Dining", "Liabilities:Card"]),
		];

		let corpus =
			Corpus::build(&history, TargetKind::Account, &scope, &tokenizer).unwrap();
		let pairs: Vec<(&str, &str)> = corpus
			.examples
			.iter()
			.map(|e| (e.document.terms()[2].as_str(), e.label.as_str()))
			.collect();
		assert_eq!(
			pairs,
			vec![
				("r:expenses_dining", "Liabilities:Card"),
				("r:liabilities_card", "Expenses:Dining"),
				("r:expenses_dining", "Liabilities:Card"),
				("r:liabilities_card", "Expenses:Dining"),
			]
		);
	}

	#[test]
	fn test_unresolved_history_is_skipped() {
		let options = checking();
		let scope = Scope::new(&options);
		let tokenizer = Tokenizer::new(1, false).unwrap();
		let mut history = history();
		history.push(
			Entry::new(Date::from_str("2024-01-11").unwrap(), "MYSTERY")
				.with_posting(Posting::account_only("Expenses:Other"))
				.with_posting(Posting::account_only("Equity:PLACEHOLDER")),
		);

		let corpus =
			Corpus::build(&history, TargetKind::Account, &scope, &tokenizer).unwrap();
		assert!(!corpus.labels().contains("Expenses:Other"));
		assert_eq!(corpus.len(), 3);
	}

	#[test]
	fn test_training_account_filter() {
		let options = Options {
			training_account: Some("Assets:Card".into()),
			..Default::default()
		};
		let scope = Scope::new(&options);
		let tokenizer = Tokenizer::new(1, false).unwrap();
		let mut history = history();
		history.push(entry("BOOKSTORE", &["Expenses:Books", "Assets:Card"]));
		history.push(entry("CINEMA", &["Expenses:Fun", "Assets:Card"]));

		let corpus =
			Corpus::build(&history, TargetKind::Account, &scope, &tokenizer).unwrap();
		let labels = corpus.labels();
		assert!(labels.contains("Expenses:Books"));
		assert!(labels.contains("Expenses:Fun"));
		assert!(!labels.contains("Expenses:Dining"));
	}

	#[test]
	fn test_insufficient_distinct_labels() {
		let options = checking();
		let scope = Scope::new(&options);
		let tokenizer = Tokenizer::new(1, false).unwrap();
		let history = vec![
			entry("COFFEE SHOP", &["Expenses:Dining", "Assets:Checking"]),
			entry("CAFE", &["Expenses:Dining", "Assets:Checking"]),
		];

		let result = Corpus::build(&history, TargetKind::Account, &scope, &tokenizer);
		assert_eq!(
			result.unwrap_err(),
			PredictError::InsufficientData {
				kind: TargetKind::Account,
				distinct: 1,
				required: 2,
			}
		);
	}

	#[test]
	fn test_payee_corpus() {
		let options = Options::default();
		let scope = Scope::new(&options);
		let tokenizer = Tokenizer::new(1, false).unwrap();
		let history = vec![
			entry("SQ *BLUE BOTTLE", &[]).with_payee("Blue Bottle"),
			entry("AMZN MKTP US", &[]).with_payee("Amazon"),
			entry("NO PAYEE HERE", &[]),
			entry("", &[]).with_payee("Nobody"),
		];

		let corpus =
			Corpus::build(&history, TargetKind::Payee, &scope, &tokenizer).unwrap();
		assert_eq!(corpus.len(), 2);
		assert_eq!(
			corpus.labels().into_iter().collect::<Vec<_>>(),
			vec!["Amazon", "Blue Bottle"]
		);
	}
}
