#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	recolor::{buildMappings, raster::RasterFormat, stdoutRaw, FileHandler},
	std::{
		io::{self, BufWriter, Read, Write},
		process::ExitCode,
	},
};

/// Recolors one image from stdin onto stdout: rasters come out as PNG, anything else is treated as SVG text.
fn main() -> ExitCode {
	#[derive(Parser)]
	struct Args {
		/// Color mappings like '#ff00d9=>#0abab5'
		#[clap(required = true)]
		mappings: Vec<String>,
	}
	let Args { mappings } = Args::parse();
	let mapping = match buildMappings(&mappings) {
		Ok(mapping) => mapping,
		Err(err) => {
			eprintln!("Error: {err}");
			return ExitCode::from(2);
		}
	};
	let input = &mut Vec::new();
	if let Err(err) = io::stdin().lock().read_to_end(input) {
		eprintln!("stdin: {err}");
		return ExitCode::FAILURE;
	}
	let handler = RasterFormat::sniff(input).map_or(FileHandler::Vector, FileHandler::Raster);
	let (output, counts) = match handler.transform(std::mem::take(input), &mapping) {
		Ok((output, counts)) => (output, counts.unwrap_or_default()),
		Err(err) => {
			eprintln!("stdin: {err}");
			return ExitCode::FAILURE;
		}
	};
	for (entry, count) in mapping.entries().iter().zip(counts.asSlice()) {
		eprintln!("{} -> {}: {count}", entry.source, entry.dest);
	}
	let stdout = &mut BufWriter::new(stdoutRaw());
	match stdout.write_all(&output).and_then(|()| stdout.flush()) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("stdout: {err}");
			ExitCode::FAILURE
		}
	}
}
