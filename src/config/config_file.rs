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
use crate::predict::error::PredictError;
use crate::predict::options::Options;
use crate::predict::target::TargetKind;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
	pub predict: Option<Predict>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Predict {
	/// e.g. ["account", "payee"]
	pub targets: Option<Vec<String>>,
	pub confidence_threshold: Option<Thresholds>,
	pub top_k: Option<usize>,
	pub allow_override: Option<bool>,
	pub suggest: Option<bool>,
	pub add_counter_posting: Option<bool>,
	pub date_features: Option<bool>,
	pub ngram_max: Option<usize>,
	pub min_distinct_labels: Option<usize>,

	/// Accounts the importer fills in itself, e.g. the bank account
	/// a statement was downloaded for. Never predicted.
	pub known_accounts: Option<Vec<String>>,

	/// If set, only history posting to this account is learned from.
	pub training_account: Option<String>,
	pub placeholder_account: Option<String>,
	pub timeout_secs: Option<f64>,
	pub model: Option<Model>,
}

/// Either one threshold for every target, or one per target.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
	pub default: Option<f64>,
	pub account: Option<f64>,
	pub payee: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Model {
	pub l2: Option<f64>,
	pub learning_rate: Option<f64>,
	pub tolerance: Option<f64>,
	pub max_iterations: Option<usize>,
}

impl Config {
	/// Layers the file's settings over the defaults. The result is not
	/// validated yet; command line overrides still apply on top.
	pub fn options(&self) -> Result<Options, PredictError> {
		let mut options = Options::default();

		let Some(predict) = &self.predict else {
			return Ok(options);
		};

		if let Some(targets) = &predict.targets {
			options.target_kinds = targets
				.iter()
				.map(|t| TargetKind::from_str(t))
				.collect::<Result<_, _>>()?;
		}

		if let Some(thresholds) = &predict.confidence_threshold {
			if let Some(t) = thresholds.default {
				options.set_threshold(t);
			}
			if let Some(t) = thresholds.account {
				options.confidence_threshold.insert(TargetKind::Account, t);
			}
			if let Some(t) = thresholds.payee {
				options.confidence_threshold.insert(TargetKind::Payee, t);
			}
		}

		if let Some(v) = predict.top_k {
			options.top_k = v;
		}
		if let Some(v) = predict.allow_override {
			options.allow_override = v;
		}
		if let Some(v) = predict.suggest {
			options.suggest = v;
		}
		if let Some(v) = predict.add_counter_posting {
			options.add_counter_posting = v;
		}
		if let Some(v) = predict.date_features {
			options.date_features = v;
		}
		if let Some(v) = predict.ngram_max {
			options.ngram_max = v;
		}
		if let Some(v) = predict.min_distinct_labels {
			options.min_distinct_labels = v;
		}
		if let Some(v) = &predict.known_accounts {
			options.known_accounts = v.clone();
		}
		if let Some(v) = &predict.training_account {
			options.training_account = Some(v.clone());
		}
		if let Some(v) = &predict.placeholder_account {
			options.placeholder_account = v.clone();
		}
		if let Some(secs) = predict.timeout_secs {
			options.timeout = Some(parse_timeout(secs)?);
		}

		if let Some(model) = &predict.model {
			if let Some(v) = model.l2 {
				options.model.l2 = v;
			}
			if let Some(v) = model.learning_rate {
				options.model.learning_rate = v;
			}
			if let Some(v) = model.tolerance {
				options.model.tolerance = v;
			}
			if let Some(v) = model.max_iterations {
				options.model.max_iterations = v;
			}
		}

		Ok(options)
	}
}

pub fn parse_timeout(secs: f64) -> Result<Duration, PredictError> {
	Duration::try_from_secs_f64(secs).map_err(|_| {
		PredictError::Configuration(format!("invalid timeout: {}", secs))
	})
}
