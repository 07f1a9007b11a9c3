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
pub mod config;
pub mod gl;
pub mod parsing;
pub mod predict;
pub mod reports;
pub mod util;

pub use gl::entry::{Entry, Posting, PLACEHOLDER};
pub use predict::error::PredictError;
pub use predict::merge::MergeOutcome;
pub use predict::options::{ModelOptions, Options};
pub use predict::pipeline::{augment, Augmented, EntryReport, TargetRecord, Warning};
pub use predict::predictor::Prediction;
pub use predict::target::TargetKind;
