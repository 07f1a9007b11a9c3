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
use crate::predict::merge::MergeOutcome;
use crate::predict::pipeline::Augmented;
use crate::reports::table::Table;

/// Lists every ranked suggestion of a run next to the entry it was made
/// for, followed by whatever was skipped and why.
pub struct PredictionReporter<'a> {
	candidates: &'a [Entry],
	augmented: &'a Augmented,
}

impl<'a> PredictionReporter<'a> {
	pub fn new(candidates: &'a [Entry], augmented: &'a Augmented) -> Self {
		Self {
			candidates,
			augmented,
		}
	}

	pub fn print(&self) {
		print!("{}", self.render());
	}

	pub fn render(&self) -> String {
		let mut table = Table::new(8);
		table.add_header(vec![
			"#",
			"Date",
			"Narration",
			"Target",
			"Rank",
			"Suggestion",
			"Confidence",
			"Outcome",
		]);
		table.add_separator();
		table.right_align(vec![0, 4, 6]);

		for report in &self.augmented.reports {
			let Some(entry) = self.candidates.get(report.index) else {
				continue;
			};
			let index = (report.index + 1).to_string();
			let date = entry.date().to_string();

			for (kind, record) in &report.targets {
				let kind = kind.to_string();
				let outcome = describe(&record.outcome);

				if record.predictions.is_empty() {
					table.add_row(vec![
						&index,
						&date,
						entry.narration(),
						&kind,
						"",
						"",
						"",
						&outcome,
					]);
				}

				for p in &record.predictions {
					let first = p.rank == 1;
					table.add_row(vec![
						if first { index.as_str() } else { "" },
						if first { date.as_str() } else { "" },
						if first { entry.narration() } else { "" },
						if first { kind.as_str() } else { "" },
						&p.rank.to_string(),
						&p.label,
						&format!("{:.3}", p.confidence),
						if first { outcome.as_str() } else { "" },
					]);
				}
			}
		}

		let mut out = table.render();

		if !self.augmented.warnings.is_empty() {
			out.push_str("\nWarnings:\n");
			for warning in &self.augmented.warnings {
				out.push_str(&format!("  {}\n", warning));
			}
		}

		out
	}
}

fn describe(outcome: &MergeOutcome) -> String {
	match outcome {
		MergeOutcome::Applied { fields: 1 } => "applied".to_string(),
		MergeOutcome::Applied { fields } => format!("applied x{}", fields),
		MergeOutcome::BelowThreshold => "below threshold".to_string(),
		MergeOutcome::Untouched => "untouched".to_string(),
	}
}
