use {
	std::{io, path::PathBuf, string::FromUtf8Error},
	thiserror::Error,
};

/// Rejection of a single mapping spec. The table being built is left as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
	#[error("Invalid mapping {0:?}. Use format #from=>#to")]
	InvalidMappingSyntax(String),

	#[error("Invalid hex values in mapping {0:?}")]
	InvalidColorValue(String),

	/// A canonicalized color was neither 6 nor 8 digits long.
	#[error("Unexpected hex length for {0:?}")]
	UnexpectedHexLength(String),
}

/// Failure local to one file of a batch.
#[derive(Debug, Error)]
pub enum FileError {
	#[error(transparent)]
	Io(#[from] io::Error),

	#[error("PNG decoding: {0}")]
	PngDecode(#[from] png::DecodingError),

	#[error("PNG encoding: {0}")]
	PngEncode(#[from] png::EncodingError),

	#[error("image decoding: {0}")]
	ImageDecode(#[from] image::ImageError),

	#[error("unsupported PNG layout: {0:?} at {1:?}")]
	UnsupportedPngLayout(png::ColorType, png::BitDepth),

	#[error("SVG is not valid UTF-8: {0}")]
	NotUtf8(#[from] FromUtf8Error),

	#[error("output {0:?} is already claimed by another input")]
	OutputCollision(PathBuf),

	#[error("cancelled")]
	Cancelled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("{0:?}: {1}")]
	Read(PathBuf, #[source] io::Error),

	#[error("{0:?}: {1}")]
	Parse(PathBuf, #[source] toml::de::Error),

	#[error(transparent)]
	Mapping(#[from] MappingError),
}
