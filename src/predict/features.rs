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
use crate::predict::target::TargetKind;
use chrono::Weekday;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Runs of letters or digits; everything else separates tokens.
const TOKEN_PATTERN: &str = r"[\p{L}\p{N}]+";

/// The terms of one entry's text fields, before they are mapped onto a
/// vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
	terms: Vec<String>,
}

impl Document {
	pub fn terms(&self) -> &[String] {
		&self.terms
	}
}

/// Turns entries into Documents. Holds no state learned from data, so the
/// same instance serves training and prediction alike.
#[derive(Clone, Debug)]
pub struct Tokenizer {
	token_regex: Regex,
	ngram_max: usize,
	date_features: bool,
}

impl Tokenizer {
	pub fn new(ngram_max: usize, date_features: bool) -> Result<Self, PredictError> {
		let token_regex = Regex::new(TOKEN_PATTERN)
			.map_err(|e| PredictError::Configuration(e.to_string()))?;

		Ok(Self {
			token_regex,
			ngram_max: ngram_max.max(1),
			date_features,
		})
	}

	/// Builds the document for `entry` as seen by the given target kind.
	/// `reference` is the account the entry was imported against, if any; it
	/// becomes one extra term. `index` only identifies the entry in the error.
	pub fn document(
		&self,
		entry: &Entry,
		kind: TargetKind,
		reference: Option<&str>,
		index: usize,
	) -> Result<Document, PredictError> {
		let mut terms = vec![];

		for (prefix, text) in kind.text_fields(entry) {
			let tokens = self.tokens(text);
			for n in 1..=self.ngram_max.min(tokens.len()) {
				for gram in tokens.windows(n) {
					terms.push(format!("{}:{}", prefix, gram.join("_")));
				}
			}
		}

		if terms.is_empty() {
			return Err(PredictError::FeatureExtraction {
				kind,
				index,
				reason: "no words in any text field".to_string(),
			});
		}

		if let Some(account) = reference {
			terms.push(format!("r:{}", self.tokens(account).join("_")));
		}

		if self.date_features {
			let date = entry.date();
			terms.push(format!("dom:{}", date.day()));
			terms.push(format!("dow:{}", weekday_name(date.weekday())));
		}

		Ok(Document { terms })
	}

	fn tokens(&self, text: &str) -> Vec<String> {
		self.token_regex
			.find_iter(&text.to_lowercase())
			.map(|m| m.as_str().to_string())
			.collect()
	}
}

fn weekday_name(day: Weekday) -> &'static str {
	match day {
		Weekday::Mon => "mon",
		Weekday::Tue => "tue",
		Weekday::Wed => "wed",
		Weekday::Thu => "thu",
		Weekday::Fri => "fri",
		Weekday::Sat => "sat",
		Weekday::Sun => "sun",
	}
}

/// A sparse, L2-normalized tf-idf vector. Pairs are (term index, weight),
/// sorted by index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
	entries: Vec<(usize, f64)>,
}

impl FeatureVector {
	pub fn iter(&self) -> impl Iterator<Item = &(usize, f64)> {
		self.entries.iter()
	}

	/// True when no term of the document was in the vocabulary.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}

/// Term index and inverse document frequencies, fitted on one run's training
/// documents and discarded with the run.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
	/// term -> index; indices follow lexicographic term order
	terms: BTreeMap<String, usize>,
	idf: Vec<f64>,
}

impl Vocabulary {
	pub fn fit(documents: &[Document]) -> Self {
		let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
		for doc in documents {
			let unique: BTreeSet<&str> = doc.terms.iter().map(String::as_str).collect();
			for term in unique {
				*document_frequency.entry(term).or_insert(0) += 1;
			}
		}

		// Smoothed idf, as though one extra document contained every term
		let n = documents.len() as f64;
		let mut terms = BTreeMap::new();
		let mut idf = Vec::with_capacity(document_frequency.len());
		for (i, (term, df)) in document_frequency.into_iter().enumerate() {
			terms.insert(term.to_string(), i);
			idf.push(((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0);
		}

		Self { terms, idf }
	}

	pub fn len(&self) -> usize {
		self.terms.len()
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}

	/// Maps a document onto this vocabulary. Terms the vocabulary has never
	/// seen are dropped; a document made only of those becomes the empty
	/// vector, for which the classifier answers with its class prior.
	pub fn transform(&self, document: &Document) -> FeatureVector {
		let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
		for term in &document.terms {
			if let Some(&idx) = self.terms.get(term) {
				*counts.entry(idx).or_insert(0.0) += 1.0;
			}
		}

		let mut entries: Vec<(usize, f64)> = counts
			.into_iter()
			.map(|(idx, tf)| (idx, tf * self.idf[idx]))
			.collect();

		let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
		if norm > 0.0 {
			for (_, v) in &mut entries {
				*v /= norm;
			}
		}

		FeatureVector { entries }
	}
}

/// The one path from an entry to its feature vector: tokenize, then map onto
/// the run's vocabulary. Training vectors and prediction vectors both come
/// out of here.
#[derive(Clone, Debug)]
pub struct FeatureExtractor {
	tokenizer: Tokenizer,
	vocabulary: Vocabulary,
}

impl FeatureExtractor {
	pub fn new(tokenizer: Tokenizer, vocabulary: Vocabulary) -> Self {
		Self {
			tokenizer,
			vocabulary,
		}
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocabulary
	}

	pub fn vectorize(&self, document: &Document) -> FeatureVector {
		self.vocabulary.transform(document)
	}

	pub fn extract(
		&self,
		entry: &Entry,
		kind: TargetKind,
		reference: Option<&str>,
		index: usize,
	) -> Result<FeatureVector, PredictError> {
		let document = self.tokenizer.document(entry, kind, reference, index)?;
		Ok(self.vectorize(&document))
	}
}
