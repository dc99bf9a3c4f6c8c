#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	const_format::concatcp,
	recolor::{
		batch::{scanInputFiles, BatchReport, Dispatcher},
		config::Config,
		mapping::{buildMappings, ColorMapping, ARROW_SEPARATOR},
	},
	std::{
		error::Error,
		fs,
		io::{self, BufRead, Write},
		path::PathBuf,
		process::ExitCode,
	},
	tracing::info,
	tracing_subscriber::EnvFilter,
};

const PROMPT_INTRO: &str =
	concatcp!("Enter color mappings (blank line to finish). Format: #from", ARROW_SEPARATOR, "#to");
const PROMPT: &str = "mapping> ";

#[derive(Parser)]
#[clap(about = "Batch replace colors in images (raster + SVG).")]
struct Args {
	/// Input directory containing images
	#[clap(short, long)]
	input: Option<PathBuf>,

	/// Output directory for processed images
	#[clap(short, long)]
	output: Option<PathBuf>,

	/// Color mappings like '#ff00d9=>#0abab5' (repeatable)
	#[clap(short, long)]
	mapping: Vec<String>,

	/// Prompt for mappings interactively if not provided
	#[clap(long)]
	interactive: bool,

	/// TOML file with input, output, threads and mappings
	#[clap(long)]
	config: Option<PathBuf>,

	/// Worker threads (0 = one per core)
	#[clap(long)]
	threads: Option<usize>,

	/// Also write the summary as TOML to this path
	#[clap(long)]
	summaryToml: Option<PathBuf>,
}

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_writer(io::stderr)
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.init();
	run(Args::parse()).unwrap_or_else(|err| {
		eprintln!("Error: {err}");
		ExitCode::from(2)
	})
}

fn run(args: Args) -> Result<ExitCode, Box<dyn Error>> {
	let Args { input, output, mapping: mappingSpecs, interactive, config, threads, summaryToml } = args;
	let config = config.as_deref().map(Config::load).transpose()?.unwrap_or_default();
	let (Some(inputDir), Some(outputDir)) = (input.or(config.input.clone()), output.or(config.output.clone())) else {
		return Err("both --input and --output are required (or set them in --config)".into());
	};
	if let Some(threads) = threads.or(config.threads).filter(|&threads| threads > 0) {
		rayon::ThreadPoolBuilder::new().num_threads(threads).build_global()?;
	}

	let mut mapping = config.colorMapping()?;
	mapping.extend(buildMappings(&mappingSpecs)?);
	if interactive || mapping.isEmpty() {
		promptMappings(&mut io::stdin().lock(), &mut io::stdout(), &mut mapping)?;
	}
	if mapping.isEmpty() {
		println!("No mappings provided. Exiting.");
		return Ok(ExitCode::FAILURE);
	}

	fs::create_dir_all(&outputDir).map_err(|err| format!("{outputDir:?}: {err}"))?;
	let files = scanInputFiles(&inputDir).map_err(|err| format!("{inputDir:?}: {err}"))?;
	println!("Processing {} files with {} mappings...", files.len(), mapping.len());
	info!(
		input = %inputDir.display(),
		output = %outputDir.display(),
		threads = rayon::current_num_threads(),
		"batch start"
	);

	let BatchReport { outcomes, summary } = Dispatcher::new(&mapping, &outputDir).processBatch(&files);
	for outcome in &outcomes {
		let name = outcome.input.file_name().unwrap_or_default().to_string_lossy();
		match &outcome.result {
			Ok(fileResult) => println!("{name}: replaced={}", fileResult.replacedTotal()),
			Err(err) => println!("{name}: error: {err}"),
		}
	}
	println!("\nSummary:");
	for (source, dest, count) in summary.rows(&mapping) {
		println!("  {source} -> {dest}: {count}");
	}
	println!("Processed {} files. Output in {}", summary.filesProcessed, outputDir.display());

	if let Some(path) = summaryToml {
		fs::write(&path, summary.toTOML(&mapping)?).map_err(|err| format!("{path:?}: {err}"))?;
	}
	Ok(if summary.failures.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(2) })
}

/// Reads one spec per line until a blank line or EOF. A rejected spec is reported and the loop goes on.
fn promptMappings(input: &mut impl BufRead, output: &mut impl Write, mapping: &mut ColorMapping) -> io::Result<()> {
	writeln!(output, "{PROMPT_INTRO}")?;
	let line = &mut String::new();
	loop {
		write!(output, "{PROMPT}")?;
		output.flush()?;
		line.clear();
		if input.read_line(line)? == 0 {
			break;
		}
		let spec = line.trim();
		if spec.is_empty() {
			break;
		}
		if let Err(err) = mapping.insertSpec(spec) {
			writeln!(output, "Error: {err}")?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use {super::*, std::io::Cursor};

	fn prompt(lines: &str, mapping: &mut ColorMapping) -> String {
		let mut output = Vec::new();
		promptMappings(&mut Cursor::new(lines), &mut output, mapping).unwrap();
		String::from_utf8(output).unwrap()
	}

	#[test]
	fn stops_at_blank_line() {
		let mapping = &mut ColorMapping::new();
		let output = prompt("#ff00aa=>#000\n\n#111=>#222\n", mapping);
		assert_eq!(mapping.len(), 1);
		assert_eq!(mapping.get("#ff00aa"), Some("#000000"));
		assert!(output.starts_with(PROMPT_INTRO));
		assert_eq!(output.matches(PROMPT).count(), 2);
	}

	#[test]
	fn reports_bad_specs_and_keeps_going() {
		let mapping = &mut buildMappings(["#abc=>#def"]).unwrap();
		let output = prompt("oops\n#12=>#000\n#111:#222", mapping);
		assert_eq!(mapping.len(), 2);
		assert_eq!(mapping.get("#111111"), Some("#222222"));
		assert!(output.contains("Error: Invalid mapping \"oops\". Use format #from=>#to"));
		assert!(output.contains("Error: Invalid hex values in mapping \"#12=>#000\""));
	}

	#[test]
	fn intro_names_the_arrow_format() {
		assert!(PROMPT_INTRO.ends_with("#from=>#to"));
	}
}
