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
use crate::predict::classifier::Classifier;
use crate::predict::corpus::Corpus;
use crate::predict::error::PredictError;
use crate::predict::features::{FeatureExtractor, FeatureVector, Tokenizer, Vocabulary};
use crate::predict::target::{Scope, TargetKind};
use serde::Serialize;
use std::cmp::Ordering;
use std::time::Instant;
use tracing::debug;

/// One ranked answer for one candidate entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
	/// Position of the candidate in its batch
	pub entry: usize,
	pub label: String,
	/// The model's probability for this label, in [0, 1]
	pub confidence: f64,
	/// 1 for the best label
	pub rank: usize,
}

/// A model trained for one target kind, together with the vocabulary it was
/// trained on. Lives for one run only.
#[derive(Debug)]
pub struct Predictor {
	kind: TargetKind,
	extractor: FeatureExtractor,
	classifier: Classifier,
	top_k: usize,
}

impl Predictor {
	/// Builds the corpus from history, fits the vocabulary and the model.
	pub fn train(
		history: &[Entry],
		kind: TargetKind,
		scope: &Scope,
		deadline: Option<Instant>,
	) -> Result<Self, PredictError> {
		let options = scope.options;
		let tokenizer = Tokenizer::new(options.ngram_max, options.date_features)?;
		let corpus = Corpus::build(history, kind, scope, &tokenizer)?;

		let documents: Vec<_> =
			corpus.examples.iter().map(|e| e.document.clone()).collect();
		let extractor = FeatureExtractor::new(tokenizer, Vocabulary::fit(&documents));

		let examples: Vec<(FeatureVector, &str)> = corpus
			.examples
			.iter()
			.map(|e| (extractor.vectorize(&e.document), e.label.as_str()))
			.collect();

		debug!(
			"training {} model on {} examples over {} terms",
			kind,
			examples.len(),
			extractor.vocabulary().len()
		);

		let classifier = Classifier::fit(
			kind,
			&examples,
			extractor.vocabulary().len(),
			&options.model,
			deadline,
		)?;

		Ok(Self {
			kind,
			extractor,
			classifier,
			top_k: options.top_k,
		})
	}

	pub fn kind(&self) -> TargetKind {
		self.kind
	}

	/// Returns up to `top_k` labels for the candidate, best first. The
	/// candidate's own reference account is never suggested as its
	/// counterpart. Ties in confidence are broken by label so results never
	/// depend on anything but the input.
	pub fn predict(
		&self,
		entry: &Entry,
		scope: &Scope,
		index: usize,
	) -> Result<Vec<Prediction>, PredictError> {
		let reference = self.kind.reference(entry, scope);
		let x = self.extractor.extract(entry, self.kind, reference, index)?;
		let probs = self.classifier.predict_proba(&x);

		let mut ranked: Vec<(&String, f64)> = self
			.classifier
			.labels()
			.iter()
			.zip(probs)
			.filter(|(label, _)| Some(label.as_str()) != reference)
			.collect();
		ranked.sort_by(|a, b| {
			b.1.partial_cmp(&a.1)
				.unwrap_or(Ordering::Equal)
				.then_with(|| a.0.cmp(b.0))
		});

		Ok(ranked
			.into_iter()
			.take(self.top_k)
			.enumerate()
			.map(|(i, (label, confidence))| Prediction {
				entry: index,
				label: label.clone(),
				confidence,
				rank: i + 1,
			})
			.collect())
	}
}
