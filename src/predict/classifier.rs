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
use crate::predict::features::FeatureVector;
use crate::predict::options::ModelOptions;
use crate::predict::target::TargetKind;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Multinomial logistic regression over sparse tf-idf features. Scores are
/// softmax probabilities, so they can be compared against a confidence
/// threshold as they are.
///
/// Fitting is full-batch gradient descent from all-zero weights, so the same
/// examples always produce the same model.
#[derive(Clone, Debug)]
pub struct Classifier {
	/// Class labels, sorted
	labels: Vec<String>,
	/// One row of weights per class, one column per vocabulary term
	weights: Vec<Vec<f64>>,
	intercepts: Vec<f64>,
}

impl Classifier {
	/// Fits the model on (vector, label) pairs over a vocabulary of
	/// `dimensions` terms.
	///
	/// Classes are weighted by n / (classes * count) so a rare account still
	/// pulls its weight against a frequent one. Fails with ModelFit when
	/// fewer than two classes are present, when the loss stops being finite,
	/// or when `max_iterations` pass without convergence; fails with Timeout
	/// once `deadline` passes.
	pub fn fit(
		kind: TargetKind,
		examples: &[(FeatureVector, &str)],
		dimensions: usize,
		options: &ModelOptions,
		deadline: Option<Instant>,
	) -> Result<Self, PredictError> {
		let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
		for (_, label) in examples {
			*counts.entry(*label).or_insert(0) += 1;
		}

		if counts.len() < 2 {
			return Err(PredictError::ModelFit {
				kind,
				reason: format!("need at least 2 classes, got {}", counts.len()),
			});
		}

		let labels: Vec<String> = counts.keys().map(|l| l.to_string()).collect();
		let class_count = labels.len();
		let n = examples.len() as f64;

		let class_weight: Vec<f64> = counts
			.values()
			.map(|&c| n / (class_count as f64 * c as f64))
			.collect();

		let targets: Vec<usize> = examples
			.iter()
			.map(|(_, label)| labels.iter().position(|l| l == label).unwrap_or(0))
			.collect();
		let total_weight: f64 = targets.iter().map(|&y| class_weight[y]).sum();

		let mut model = Self {
			labels,
			weights: vec![vec![0.0; dimensions]; class_count],
			intercepts: vec![0.0; class_count],
		};

		let mut grad_w = vec![vec![0.0; dimensions]; class_count];
		let mut grad_b = vec![0.0; class_count];
		let mut previous_loss: Option<f64> = None;

		for iteration in 1..=options.max_iterations {
			if deadline.is_some_and(|d| Instant::now() >= d) {
				return Err(PredictError::Timeout { kind });
			}

			grad_w.iter_mut().for_each(|row| row.fill(0.0));
			grad_b.fill(0.0);
			let mut loss = 0.0;

			for ((x, _), &y) in examples.iter().zip(&targets) {
				let weight = class_weight[y];
				let probs = model.predict_proba(x);
				loss -= weight * probs[y].max(f64::MIN_POSITIVE).ln();

				for (c, p) in probs.iter().enumerate() {
					let indicator = if c == y { 1.0 } else { 0.0 };
					let g = weight * (p - indicator) / total_weight;
					grad_b[c] += g;
					for &(i, v) in x.iter() {
						grad_w[c][i] += g * v;
					}
				}
			}

			let penalty: f64 = model
				.weights
				.iter()
				.flat_map(|row| row.iter())
				.map(|w| w * w)
				.sum();
			loss = loss / total_weight + 0.5 * options.l2 * penalty;

			if !loss.is_finite() {
				return Err(PredictError::ModelFit {
					kind,
					reason: format!("loss diverged at iteration {}", iteration),
				});
			}

			for c in 0..class_count {
				model.intercepts[c] -= options.learning_rate * grad_b[c];
				for (w, g) in model.weights[c].iter_mut().zip(&grad_w[c]) {
					*w -= options.learning_rate * (g + options.l2 * *w);
				}
			}

			if let Some(prev) = previous_loss {
				if (prev - loss).abs() <= options.tolerance * prev.abs().max(1.0) {
					debug!(
						"{} model converged after {} iterations, loss {:.6}",
						kind, iteration, loss
					);
					return Ok(model);
				}
			}
			previous_loss = Some(loss);
		}

		Err(PredictError::ModelFit {
			kind,
			reason: format!(
				"no convergence within {} iterations",
				options.max_iterations
			),
		})
	}

	pub fn labels(&self) -> &[String] {
		&self.labels
	}

	/// Probability of each class, in label order. An empty vector scores
	/// every class by its intercept alone.
	pub fn predict_proba(&self, x: &FeatureVector) -> Vec<f64> {
		let scores: Vec<f64> = self
			.weights
			.iter()
			.zip(&self.intercepts)
			.map(|(row, b)| b + x.iter().map(|&(i, v)| row[i] * v).sum::<f64>())
			.collect();
		softmax(&scores)
	}
}

fn softmax(scores: &[f64]) -> Vec<f64> {
	let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
	let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
	let sum: f64 = exps.iter().sum();
	exps.into_iter().map(|e| e / sum).collect()
}
