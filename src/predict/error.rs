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
use crate::predict::target::TargetKind;
use thiserror::Error;

/// Everything that can go wrong while predicting. Only `Configuration` is
/// fatal to a run; the rest are data conditions that skip one target kind, or
/// one entry for one target kind, and are reported as warnings.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PredictError {
	/// The history holds too few distinct labels to fit a classifier
	#[error(
		"not enough history to predict {kind}: {distinct} distinct label(s), need at least {required}"
	)]
	InsufficientData {
		kind: TargetKind,
		distinct: usize,
		required: usize,
	},

	#[error("failed to fit {kind} model: {reason}")]
	ModelFit { kind: TargetKind, reason: String },

	/// A single entry had nothing to extract features from
	#[error("entry {index} cannot be used for {kind} prediction: {reason}")]
	FeatureExtraction {
		kind: TargetKind,
		index: usize,
		reason: String,
	},

	#[error("invalid configuration: {0}")]
	Configuration(String),

	#[error("{kind} prediction exceeded the time limit")]
	Timeout { kind: TargetKind },
}

impl PredictError {
	/// The target kind the error is confined to, if any.
	pub fn kind(&self) -> Option<TargetKind> {
		match self {
			PredictError::InsufficientData { kind, .. }
			| PredictError::ModelFit { kind, .. }
			| PredictError::FeatureExtraction { kind, .. }
			| PredictError::Timeout { kind } => Some(*kind),
			PredictError::Configuration(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_messages_name_the_target_kind() {
		let err = PredictError::InsufficientData {
			kind: TargetKind::Payee,
			distinct: 1,
			required: 2,
		};
		assert_eq!(
			err.to_string(),
			"not enough history to predict payee: 1 distinct label(s), need at least 2"
		);
		assert_eq!(err.kind(), Some(TargetKind::Payee));
	}

	#[test]
	fn test_configuration_has_no_kind() {
		let err = PredictError::Configuration("top_k must be at least 1".into());
		assert_eq!(err.kind(), None);
		assert!(err.to_string().starts_with("invalid configuration"));
	}
}
