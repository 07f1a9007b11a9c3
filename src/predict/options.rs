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
use crate::gl::entry::PLACEHOLDER;
use crate::predict::error::PredictError;
use crate::predict::target::TargetKind;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Runtime configuration of one prediction run. Defaults are deliberately
/// permissive about confidence (threshold 0, i.e. always apply) and strict
/// about what counts as usable history.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
	/// Which fields to predict, in the order their merges are applied
	pub target_kinds: Vec<TargetKind>,

	/// Minimum confidence for a prediction to be written into an entry.
	/// Kinds without an entry use 0.0.
	pub confidence_threshold: BTreeMap<TargetKind, f64>,

	/// Number of ranked suggestions kept per entry and target kind
	pub top_k: usize,

	/// Whether predictions may replace fields the importer already filled
	pub allow_override: bool,

	/// Attach ranked suggestions to entries as metadata
	pub suggest: bool,

	/// Give single-posting entries a new posting for the predicted account
	pub add_counter_posting: bool,

	/// Add day-of-month and weekday terms to the features
	pub date_features: bool,

	/// Longest word n-gram taken from each text field
	pub ngram_max: usize,

	/// Fewer distinct labels than this in history means no prediction
	pub min_distinct_labels: usize,

	/// Source accounts supplied by the importer, in addition to those
	/// inferred from the candidates themselves
	pub known_accounts: Vec<String>,

	/// If set, only history posting to this account trains account models
	pub training_account: Option<String>,

	/// Account name that marks a posting as unresolved
	pub placeholder_account: String,

	/// Upper bound on the whole run
	pub timeout: Option<Duration>,

	pub model: ModelOptions,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			target_kinds: TargetKind::ALL.to_vec(),
			confidence_threshold: BTreeMap::new(),
			top_k: 3,
			allow_override: false,
			suggest: true,
			add_counter_posting: true,
			date_features: false,
			ngram_max: 2,
			min_distinct_labels: 2,
			known_accounts: vec![],
			training_account: None,
			placeholder_account: PLACEHOLDER.to_string(),
			timeout: None,
			model: ModelOptions::default(),
		}
	}
}

/// Hyperparameters of the softmax classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOptions {
	/// L2 penalty on the weights (intercepts are not penalized)
	pub l2: f64,
	pub learning_rate: f64,
	/// Relative change in loss below which the fit counts as converged
	pub tolerance: f64,
	pub max_iterations: usize,
}

impl Default for ModelOptions {
	fn default() -> Self {
		Self {
			l2: 0.001,
			learning_rate: 1.0,
			tolerance: 1e-6,
			max_iterations: 10_000,
		}
	}
}

impl Options {
	pub fn threshold(&self, kind: TargetKind) -> f64 {
		self.confidence_threshold.get(&kind).copied().unwrap_or(0.0)
	}

	/// Sets the same threshold for every target kind.
	pub fn set_threshold(&mut self, threshold: f64) {
		for kind in TargetKind::ALL {
			self.confidence_threshold.insert(kind, threshold);
		}
	}

	/// Rejects settings that can only come from a caller mistake. Runs before
	/// any training starts.
	pub fn validate(&self) -> Result<(), PredictError> {
		let fail = |msg: String| Err(PredictError::Configuration(msg));

		if self.target_kinds.is_empty() {
			return fail("at least one target kind is required".into());
		}

		let unique: BTreeSet<_> = self.target_kinds.iter().collect();
		if unique.len() != self.target_kinds.len() {
			return fail("target kinds may not repeat".into());
		}

		for (kind, threshold) in &self.confidence_threshold {
			if !threshold.is_finite() || !(0.0..=1.0).contains(threshold) {
				return fail(format!(
					"confidence threshold for {} must be within [0, 1], got {}",
					kind, threshold
				));
			}
		}

		if self.top_k < 1 {
			return fail("top_k must be at least 1".into());
		}

		if self.ngram_max < 1 {
			return fail("ngram_max must be at least 1".into());
		}

		if self.min_distinct_labels < 2 {
			return fail(format!(
				"min_distinct_labels must be at least 2, got {}",
				self.min_distinct_labels
			));
		}

		if self.placeholder_account.trim().is_empty() {
			return fail("placeholder_account may not be empty".into());
		}

		if let Some(timeout) = self.timeout {
			if timeout.is_zero() {
				return fail("timeout must be positive".into());
			}
		}

		self.model.validate()
	}
}

impl ModelOptions {
	fn validate(&self) -> Result<(), PredictError> {
		let positive = |name: &str, v: f64| {
			if v.is_finite() && v > 0.0 {
				Ok(())
			} else {
				Err(PredictError::Configuration(format!(
					"model.{} must be positive, got {}",
					name, v
				)))
			}
		};

		positive("learning_rate", self.learning_rate)?;
		positive("tolerance", self.tolerance)?;
		if !self.l2.is_finite() || self.l2 < 0.0 {
			return Err(PredictError::Configuration(format!(
				"model.l2 may not be negative, got {}",
				self.l2
			)));
		}
		if self.max_iterations == 0 {
			return Err(PredictError::Configuration(
				"model.max_iterations must be at least 1".into(),
			));
		}

		Ok(())
	}
}
