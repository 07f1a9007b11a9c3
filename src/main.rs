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
use anyhow::{bail, Error};
use clap::{Parser, ValueEnum};
use ledr_predict::config::config_file::parse_timeout;
use ledr_predict::parsing::filesystem::Filesystem;
use ledr_predict::reports::prediction_reporter::PredictionReporter;
use ledr_predict::{augment, Options, TargetKind};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
	name = "ledr-predict",
	version = "0.1",
	about = "Predicts missing accounts and payees of imported entries from ledger history"
)]
struct Cli {
	// ----------------
	// -- POSITIONAL --
	// ----------------
	/// The command to execute
	command: Directive,

	// -----------
	// -- FLAGS --
	// -----------
	/// Specifies the input batch file: {"history": [...], "candidates": [...]}
	#[arg(short)]
	file: String,

	/// Read history from this file (a JSON array of entries) instead
	#[arg(long)]
	history: Option<String>,

	/// Custom config file location (default: ~/.config/ledr/predict.toml)
	#[arg(long)]
	config: Option<String>,

	/// Comma-separated fields to predict, e.g. account,payee
	#[arg(short, long, value_delimiter = ',')]
	targets: Option<Vec<String>>,

	/// Minimum confidence (0 to 1) for a prediction to be applied
	#[arg(long)]
	threshold: Option<f64>,

	/// Number of ranked suggestions to keep
	#[arg(short = 'k', long)]
	top_k: Option<usize>,

	/// Allow predictions to replace fields the importer already filled
	#[arg(long = "override")]
	allow_override: bool,

	/// Give up on predictions still running after this many seconds
	#[arg(long)]
	timeout: Option<f64>,
}

impl Cli {
	/// Extra validations on top of what clap does
	fn validate(&self) -> Result<(), Error> {
		if let Some(threshold) = self.threshold {
			if !(0.0..=1.0).contains(&threshold) {
				bail!("Threshold must be between 0 and 1");
			}
		}

		Ok(())
	}

	/// Layers command line overrides over the configured options.
	fn apply(&self, options: &mut Options) -> Result<(), Error> {
		if let Some(targets) = &self.targets {
			options.target_kinds = targets
				.iter()
				.map(|t| TargetKind::from_str(t))
				.collect::<Result<_, _>>()?;
		}
		if let Some(threshold) = self.threshold {
			options.set_threshold(threshold);
		}
		if let Some(top_k) = self.top_k {
			options.top_k = top_k;
		}
		if self.allow_override {
			options.allow_override = true;
		}
		if let Some(secs) = self.timeout {
			options.timeout = Some(parse_timeout(secs)?);
		}
		Ok(())
	}
}

#[derive(ValueEnum, Clone, PartialEq)]
enum Directive {
	Predict, // print the augmented entries
	Report,  // print what was predicted for each entry
}

fn main() -> Result<(), Error> {
	// stdout is reserved for ledger output
	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new("ledr_predict=warn")),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let args = Cli::parse();
	args.validate()?;

	let config = Filesystem::get_config(args.config.as_ref())?;
	let mut options = config.options()?;
	args.apply(&mut options)?;
	options.validate()?;

	let mut batch = Filesystem::load_batch(&args.file)?;
	if let Some(history) = &args.history {
		batch.history = Filesystem::load_entries(history)?;
	}

	let augmented = augment(&batch.history, &batch.candidates, &options)?;

	match args.command {
		Directive::Predict => {
			for entry in &augmented.entries {
				println!("{}", entry.display(&options.placeholder_account));
			}
		},
		Directive::Report => {
			PredictionReporter::new(&batch.candidates, &augmented).print();
		},
	}

	Ok(())
}
