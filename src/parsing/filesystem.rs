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
use crate::config::config_file::Config;
use crate::gl::entry::Entry;
use anyhow::{anyhow, Error};
use dirs::home_dir;
use serde::Deserialize;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// One prediction run's worth of input: the categorized history to learn
/// from and the freshly imported entries to complete.
#[derive(Debug, Default, Deserialize)]
pub struct Batch {
	#[serde(default)]
	pub history: Vec<Entry>,
	pub candidates: Vec<Entry>,
}

pub struct Filesystem;

impl Filesystem {
	/// Fetches the config from the given path, or default path if none.
	pub fn get_config(custom_config_path: Option<&String>) -> Result<Config, Error> {
		let config_path = match &custom_config_path {
			None => home_dir()
				.ok_or_else(|| anyhow!("unable to determine home directory"))?
				.join(".config/ledr/predict.toml"),
			Some(p) => PathBuf::from(p),
		};

		// create empty config file if it doesn't exist
		if !config_path.exists() && custom_config_path.is_none() {
			if let Some(parent) = config_path.parent() {
				fs::create_dir_all(parent)?;
			}
			File::create(config_path.clone())?;
		}

		let content = fs::read_to_string(&config_path).map_err(|e| {
			anyhow!("failed to read {}: {}", config_path.display(), e)
		})?;
		toml::from_str(&content).map_err(|e| anyhow!("failed to parse config: {}", e))
	}

	pub fn load_batch(file_path: &str) -> Result<Batch, Error> {
		let content = Self::read(file_path)?;
		serde_json::from_str(&content)
			.map_err(|e| anyhow!("failed to parse {}: {}", file_path, e))
	}

	/// Reads a JSON array of entries.
	pub fn load_entries(file_path: &str) -> Result<Vec<Entry>, Error> {
		let content = Self::read(file_path)?;
		serde_json::from_str(&content)
			.map_err(|e| anyhow!("failed to parse {}: {}", file_path, e))
	}

	fn read(file_path: &str) -> Result<String, Error> {
		fs::read_to_string(Path::new(file_path))
			.map_err(|e| anyhow!("failed to read {}: {}", file_path, e))
	}
}
