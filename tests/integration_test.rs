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
use std::fs;
use std::process::Command;

const CONFIG: &str = "tests/test_data/predict.toml";

/// Dynamically collects test cases from a given directory.
fn collect_test_cases(subfolder: &str) -> Vec<(String, String)> {
	let dir_path = format!("tests/test_data/{}", subfolder);

	let mut test_cases = vec![];

	if let Ok(entries) = fs::read_dir(&dir_path) {
		let mut inputs = vec![];
		let mut outputs = vec![];

		for entry in entries.flatten() {
			let file_name =
				entry.file_name().into_string().unwrap_or_default();
			if file_name.ends_with("_in.json") {
				inputs.push(file_name);
			} else if file_name.ends_with("_out.txt") {
				outputs.push(file_name);
			}
		}

		inputs.sort();
		outputs.sort();

		// Pair inputs with corresponding outputs
		for input_file in inputs {
			let output_file = input_file.replace("_in.json", "_out.txt");
			if outputs.contains(&output_file) {
				test_cases.push((input_file, output_file));
			}
		}
	}

	assert!(!test_cases.is_empty(), "no test cases in {}", dir_path);
	test_cases
}

#[test]
fn test_integration_standard() {
	let test_cases = collect_test_cases("standard");
	execute("standard", test_cases, true, "predict", vec![]);
}

#[test]
fn test_integration_threshold() {
	let test_cases = collect_test_cases("threshold");
	execute("threshold", test_cases, true, "predict", vec!["--threshold", "0.999"]);
}

#[test]
fn test_integration_payees() {
	let test_cases = collect_test_cases("payees");
	execute("payees", test_cases, true, "predict", vec!["--targets", "payee"]);
}

#[test]
fn test_integration_should_fail() {
	let test_cases = collect_test_cases("failures");
	execute("failures", test_cases, false, "predict", vec![]);
}

#[test]
fn test_integration_bad_flags() {
	let test_cases = collect_test_cases("standard");
	execute("standard", test_cases.clone(), false, "predict", vec!["--threshold", "1.5"]);
	execute("standard", test_cases.clone(), false, "predict", vec!["--top-k", "0"]);
	execute("standard", test_cases, false, "predict", vec!["--targets", "tags"]);
}

#[test]
fn test_integration_report() {
	let test_cases = collect_test_cases("standard");
	for (input_file, _) in test_cases {
		let loc = format!("tests/test_data/standard/{}", input_file);
		let output = Command::new("cargo")
			.args(["run", "--", "-f", &loc, "report", "--config", CONFIG])
			.output()
			.expect("Failed to execute process");
		assert!(output.status.success());

		let stdout = String::from_utf8_lossy(&output.stdout);
		assert!(stdout.contains("Expenses:Dining"));
		assert!(stdout.contains("Warnings:"));
		assert!(stdout.contains("[payee]"));
	}
}

fn execute(
	subfolder: &str,
	test_cases: Vec<(String, String)>,
	should_succeed: bool,
	cmd: &str,
	args: Vec<&str>,
) {
	for (input_file, expected_output_file) in test_cases {
		println!("running for {}...", input_file);

		let loc = format!("{}/{}/{}", "tests/test_data", subfolder, input_file);

		let all_args = [
			vec!["run", "--", "-f", loc.as_str(), cmd, "--config", CONFIG],
			args.clone(),
		]
		.concat();

		let output = Command::new("cargo")
			.args(all_args)
			.output()
			.expect("Failed to execute process");

		if !should_succeed {
			assert!(
				!output.status.success(),
				"{} unexpectedly succeeded!",
				input_file
			);
			continue;
		}

		assert!(
			output.status.success(),
			"{} failed processing: {}",
			input_file,
			String::from_utf8_lossy(&output.stderr)
		);

		let stdout = String::from_utf8_lossy(&output.stdout);

		let expected_output = fs::read_to_string(format!(
			"{}/{}/{}",
			"tests/test_data", subfolder, expected_output_file
		))
		.expect("Failed to read expected output file");

		assert_eq!(
			stdout.trim(),
			expected_output.trim(),
			"Output did not match for {}; expected:\n{}\ngot:\n{}",
			input_file,
			expected_output.trim(),
			stdout.trim()
		);
	}
}
