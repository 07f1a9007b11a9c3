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
use crate::predict::merge::{merge, MergeOutcome};
use crate::predict::options::Options;
use crate::predict::predictor::{Prediction, Predictor};
use crate::predict::target::{Scope, TargetKind};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The result of one run: the candidates in input order, each merged with
/// whatever was confidently predicted, plus a record of what happened.
#[derive(Clone, Debug)]
pub struct Augmented {
	pub entries: Vec<Entry>,
	/// One report per candidate, same order as `entries`
	pub reports: Vec<EntryReport>,
	pub warnings: Vec<Warning>,
}

/// What was predicted for one candidate, per target kind. Kinds the
/// candidate did not need, or that failed, have no record.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EntryReport {
	pub index: usize,
	pub targets: BTreeMap<TargetKind, TargetRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TargetRecord {
	/// Ranked suggestions, best first, at most `top_k`
	pub predictions: Vec<Prediction>,
	#[serde(flatten)]
	pub outcome: MergeOutcome,
}

/// A recovered data condition. `entry` is set when only one candidate was
/// affected.
#[derive(Clone, Debug, PartialEq)]
pub struct Warning {
	pub kind: TargetKind,
	pub entry: Option<usize>,
	pub error: PredictError,
}

impl fmt::Display for Warning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.entry {
			Some(i) => write!(f, "[{} #{}] {}", self.kind, i, self.error),
			None => write!(f, "[{}] {}", self.kind, self.error),
		}
	}
}

/// Predictions for one target kind across the batch.
struct KindRun {
	kind: TargetKind,
	/// Indexed like the candidates; None where nothing was predicted
	predictions: Vec<Option<Vec<Prediction>>>,
	warnings: Vec<Warning>,
}

impl KindRun {
	fn empty(kind: TargetKind, len: usize) -> Self {
		Self {
			kind,
			predictions: vec![None; len],
			warnings: vec![],
		}
	}

	/// Drops every prediction and records why.
	fn abandon(mut self, error: PredictError) -> Self {
		warn!("skipping {} prediction: {}", self.kind, error);
		self.predictions.iter_mut().for_each(|p| *p = None);
		self.warnings.push(Warning {
			kind: self.kind,
			entry: None,
			error,
		});
		self
	}
}

/// Predicts the configured target kinds for every candidate, learning only
/// from `history`, and merges the results into copies of the candidates.
///
/// Only an invalid configuration fails the call, and it does so before any
/// training. Everything data-dependent is confined to the target kind (or
/// the single entry) it concerns and reported in `warnings`. Each kind
/// trains its own model on its own thread; nothing outlives the call.
pub fn augment(
	history: &[Entry],
	candidates: &[Entry],
	options: &Options,
) -> Result<Augmented, PredictError> {
	options.validate()?;

	let deadline = options.timeout.map(|t| Instant::now() + t);
	let scope = Scope::new(options);
	debug!("known accounts: {:?}", scope.known_accounts);

	let runs: Vec<KindRun> = options
		.target_kinds
		.par_iter()
		.map(|&kind| run_kind(history, candidates, kind, &scope, deadline))
		.collect();

	let mut entries = Vec::with_capacity(candidates.len());
	let mut reports = Vec::with_capacity(candidates.len());

	for (index, candidate) in candidates.iter().enumerate() {
		let mut entry = candidate.clone();
		let mut report = EntryReport {
			index,
			targets: BTreeMap::new(),
		};

		for run in &runs {
			if let Some(predictions) = &run.predictions[index] {
				let (merged, outcome) = merge(&entry, run.kind, predictions, &scope);
				entry = merged;
				report.targets.insert(
					run.kind,
					TargetRecord {
						predictions: predictions.clone(),
						outcome,
					},
				);
			}
		}

		entries.push(entry);
		reports.push(report);
	}

	let warnings: Vec<Warning> =
		runs.into_iter().flat_map(|run| run.warnings).collect();

	info!(
		"augmented {} candidate(s) from {} historical entries, {} warning(s)",
		candidates.len(),
		history.len(),
		warnings.len()
	);

	Ok(Augmented {
		entries,
		reports,
		warnings,
	})
}

fn run_kind(
	history: &[Entry],
	candidates: &[Entry],
	kind: TargetKind,
	scope: &Scope,
	deadline: Option<Instant>,
) -> KindRun {
	let mut run = KindRun::empty(kind, candidates.len());

	let needing: Vec<usize> = candidates
		.iter()
		.enumerate()
		.filter(|(_, e)| kind.needs(e, scope))
		.map(|(i, _)| i)
		.collect();

	if needing.is_empty() {
		debug!("no candidate needs {} prediction", kind);
		return run;
	}

	let predictor = match Predictor::train(history, kind, scope, deadline) {
		Ok(p) => p,
		Err(e) => return run.abandon(e),
	};

	for index in needing {
		if deadline.is_some_and(|d| Instant::now() >= d) {
			return run.abandon(PredictError::Timeout { kind });
		}

		match predictor.predict(&candidates[index], scope, index) {
			Ok(predictions) => run.predictions[index] = Some(predictions),
			Err(error) => {
				warn!("{}", error);
				run.warnings.push(Warning {
					kind,
					entry: Some(index),
					error,
				});
			},
		}
	}

	run
}
