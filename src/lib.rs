#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

pub const RGB_SIZE: usize = 3;
pub const RGBA_SIZE: usize = RGB_SIZE + 1;

/// Red, green, blue, alpha.
pub type Rgba = [u8; RGBA_SIZE];

pub mod batch;
pub mod config;
pub mod error;
pub mod hex;
pub mod mapping;
pub mod raster;
pub mod vector;

pub use {
	batch::{scanInputFiles, BatchReport, BatchSummary, Dispatcher, FileHandler, FileResult},
	error::{ConfigError, FileError, MappingError},
	hex::{hexToRgba, isValidHex, normalize, rgbaToHex},
	mapping::{buildMappings, ColorMapping, ReplacementCounts},
	raster::{replaceRaster, Image, RasterFormat},
	vector::replaceSvg,
};

use std::fs::File;

/// Stdout as a plain unbuffered `File`. Closes fd 1 when dropped.
#[cfg(unix)]
#[must_use]
pub fn stdoutRaw() -> File {
	use std::os::unix::io::FromRawFd;
	unsafe { File::from_raw_fd(1) }
}

#[cfg(windows)]
#[must_use]
pub fn stdoutRaw() -> File {
	use std::{
		io,
		os::windows::io::{AsRawHandle, FromRawHandle},
	};
	unsafe { File::from_raw_handle(io::stdout().as_raw_handle()) }
}
