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
use crate::gl::entry::{Entry, Posting};
use crate::predict::predictor::Prediction;
use crate::predict::target::{Scope, TargetKind};
use serde::Serialize;

/// What merging did to one entry for one target kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum MergeOutcome {
	/// The top label was written into this many fields
	Applied { fields: usize },
	/// The top label was not confident enough; fields stay unresolved
	BelowThreshold,
	/// The entry had nothing to fill for this kind
	Untouched,
}

/// Produces the merged copy of `entry`. The input is never modified.
///
/// Rules: only fields the scope marks as targets are written, and only when
/// the top prediction meets the kind's confidence threshold. Each target
/// posting receives the top label on its own; amounts are never touched.
/// With suggestions on, the ranked labels are attached as metadata whether
/// or not the top one was applied, so a human can still pick from them. A
/// suggestion list already on the entry is only replaced under override.
pub fn merge(
	entry: &Entry,
	kind: TargetKind,
	predictions: &[Prediction],
	scope: &Scope,
) -> (Entry, MergeOutcome) {
	if !kind.needs(entry, scope) {
		return (entry.clone(), MergeOutcome::Untouched);
	}

	let mut merged = entry.clone();

	let key = kind.suggestion_key();
	let keep_existing = entry.meta().contains_key(key) && !scope.options.allow_override;
	if scope.options.suggest && !predictions.is_empty() && !keep_existing {
		let labels: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
		merged.set_meta(key, serde_json::to_string(&labels).unwrap_or_default());
	}

	let top = match predictions.iter().min_by_key(|p| p.rank) {
		Some(top) if top.confidence >= scope.options.threshold(kind) => top,
		_ => return (merged, MergeOutcome::BelowThreshold),
	};

	let fields = match kind {
		TargetKind::Account => {
			let slots = scope.account_slots(entry);
			for &i in &slots.postings {
				merged.set_account(i, &top.label);
			}
			if slots.append {
				merged.add_posting(Posting::account_only(&top.label));
			}
			slots.len()
		},
		TargetKind::Payee => {
			merged.set_payee(&top.label);
			1
		},
	};

	(merged, MergeOutcome::Applied { fields })
}
