use {
	crate::{
		error::FileError,
		mapping::{ColorMapping, ReplacementCounts},
		raster::{replaceRaster, Image, RasterFormat},
		vector::replaceSvg,
	},
	rayon::prelude::*,
	serde::Serialize,
	std::{
		collections::HashSet,
		ffi::{OsStr, OsString},
		fs, io,
		path::{Path, PathBuf},
		sync::atomic::{AtomicBool, Ordering},
	},
	tracing::{debug, warn},
	walkdir::WalkDir,
};

pub const SVG_EXTENSION: &str = "svg";
pub const RASTER_OUTPUT_EXTENSION: &str = "png";
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileHandler {
	Raster(RasterFormat),
	Vector,
	Passthrough,
}

impl FileHandler {
	#[must_use]
	pub fn fromPath(path: &Path) -> Self {
		match path.extension().and_then(OsStr::to_str) {
			Some(extension) if extension.eq_ignore_ascii_case(SVG_EXTENSION) => Self::Vector,
			Some(extension) => RasterFormat::fromExtension(extension).map_or(Self::Passthrough, Self::Raster),
			None => Self::Passthrough,
		}
	}

	/// Raster output is always PNG, whatever it was decoded from.
	#[must_use]
	pub fn outputFileName(self, path: &Path) -> Option<OsString> {
		let name = path.file_name()?;
		Some(match self {
			Self::Raster(_) => Path::new(name).with_extension(RASTER_OUTPUT_EXTENSION).into_os_string(),
			Self::Vector | Self::Passthrough => name.to_owned(),
		})
	}

	/// Pass-through hands the bytes back untouched and has no counts.
	pub fn transform(
		self,
		bytes: Vec<u8>,
		mapping: &ColorMapping,
	) -> Result<(Vec<u8>, Option<ReplacementCounts>), FileError> {
		match self {
			Self::Raster(format) => {
				let mut image = Image::decode(&bytes, format)?;
				let counts = replaceRaster(&mut image, mapping);
				let mut png = Vec::with_capacity(bytes.len());
				image.toPNG(&mut png)?;
				Ok((png, Some(counts)))
			}
			Self::Vector => {
				let (svg, counts) = replaceSvg(&String::from_utf8(bytes)?, mapping);
				Ok((svg.into_bytes(), Some(counts)))
			}
			Self::Passthrough => Ok((bytes, None)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
	pub input: PathBuf,
	pub output: PathBuf,
	pub handler: FileHandler,
	pub counts: Option<ReplacementCounts>,
}

impl FileResult {
	#[must_use]
	pub fn replacedTotal(&self) -> usize {
		self.counts.as_ref().map_or(0, ReplacementCounts::total)
	}
}

#[derive(Debug)]
pub struct FileOutcome {
	pub input: PathBuf,
	pub result: Result<FileResult, FileError>,
}

/// Batch-wide totals. Every mapping key has a count, matched or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
	pub counts: ReplacementCounts,
	pub filesProcessed: usize,
	pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
	#[must_use]
	pub fn new(mapping: &ColorMapping) -> Self {
		Self { counts: ReplacementCounts::zeroed(mapping), ..Self::default() }
	}

	pub fn record(&mut self, input: &Path, result: &Result<FileResult, FileError>) {
		match result {
			Ok(fileResult) => {
				self.filesProcessed += 1;
				if let Some(counts) = &fileResult.counts {
					self.counts.add(counts);
				}
			}
			Err(err) => self.failures.push((input.to_owned(), err.to_string())),
		}
	}

	#[must_use]
	pub fn merge(mut self, other: Self) -> Self {
		self.counts.add(&other.counts);
		self.filesProcessed += other.filesProcessed;
		self.failures.extend(other.failures);
		self
	}

	/// `(source, dest, count)` in mapping order.
	pub fn rows<'a>(&'a self, mapping: &'a ColorMapping) -> impl Iterator<Item = (&'a str, &'a str, usize)> + 'a {
		mapping
			.entries()
			.iter()
			.enumerate()
			.map(move |(i, entry)| (&*entry.source, &*entry.dest, self.counts.get(i)))
	}

	pub fn toTOML(&self, mapping: &ColorMapping) -> Result<String, toml::ser::Error> {
		#[derive(Serialize)]
		struct SummaryTOML<'a> {
			filesProcessed: usize,

			#[serde(rename = "color", skip_serializing_if = "Vec::is_empty")]
			colors: Vec<ColorRow<'a>>,

			#[serde(rename = "failure", skip_serializing_if = "Vec::is_empty")]
			failures: Vec<FailureRow<'a>>,
		}
		#[derive(Serialize)]
		struct ColorRow<'a> {
			source: &'a str,
			dest: &'a str,
			count: usize,
		}
		#[derive(Serialize)]
		struct FailureRow<'a> {
			path: String,
			error: &'a str,
		}
		toml::to_string_pretty(&SummaryTOML {
			filesProcessed: self.filesProcessed,
			colors: self.rows(mapping).map(|(source, dest, count)| ColorRow { source, dest, count }).collect(),
			failures: self
				.failures
				.iter()
				.map(|(path, error)| FailureRow { path: path.display().to_string(), error })
				.collect(),
		})
	}
}

/// Per-file outcomes in input order, plus the folded summary.
#[derive(Debug)]
pub struct BatchReport {
	pub outcomes: Vec<FileOutcome>,
	pub summary: BatchSummary,
}

impl BatchReport {
	fn new(mapping: &ColorMapping) -> Self {
		Self { outcomes: Vec::new(), summary: BatchSummary::new(mapping) }
	}

	fn record(&mut self, outcome: FileOutcome) {
		self.summary.record(&outcome.input, &outcome.result);
		self.outcomes.push(outcome);
	}

	fn merge(mut self, other: Self) -> Self {
		self.outcomes.extend(other.outcomes);
		self.summary = self.summary.merge(other.summary);
		self
	}
}

/// Applies one mapping to files, writing results under `outputDir`.
/// Output only appears under its final name once completely written.
#[derive(Debug)]
pub struct Dispatcher<'a> {
	mapping: &'a ColorMapping,
	outputDir: PathBuf,
	cancelled: AtomicBool,
}

impl<'a> Dispatcher<'a> {
	pub fn new(mapping: &'a ColorMapping, outputDir: impl Into<PathBuf>) -> Self {
		Self { mapping, outputDir: outputDir.into(), cancelled: AtomicBool::new(false) }
	}

	/// Files not yet committed fail with [`FileError::Cancelled`].
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}

	#[must_use]
	pub fn isCancelled(&self) -> bool {
		self.cancelled.load(Ordering::Relaxed)
	}

	pub fn processFile(&self, input: &Path) -> Result<FileResult, FileError> {
		let handler = FileHandler::fromPath(input);
		let output = self.outputPath(handler, input)?;
		self.processInto(input, handler, output)
	}

	/// Files run on the rayon pool; each worker folds its own partial summary and the partials are added up.
	/// An input whose output or staging name was already claimed earlier in `files` fails with
	/// [`FileError::OutputCollision`].
	pub fn processBatch<P: AsRef<Path> + Sync>(&self, files: &[P]) -> BatchReport {
		let planned: Vec<_> = {
			let mut claimed = HashSet::with_capacity(2 * files.len());
			files
				.iter()
				.map(|input| {
					let (input, handler) = (input.as_ref(), FileHandler::fromPath(input.as_ref()));
					let output = self.outputPath(handler, input).and_then(|output| {
						let partial = partialPath(&output);
						if claimed.contains(&output) || claimed.contains(&partial) {
							return Err(FileError::OutputCollision(output));
						}
						claimed.insert(partial);
						claimed.insert(output.clone());
						Ok(output)
					});
					(input, handler, output)
				})
				.collect()
		};
		planned
			.into_par_iter()
			.map(|(input, handler, output)| {
				let result = output.and_then(|output| self.processInto(input, handler, output));
				if let Err(err) = &result {
					warn!(input = %input.display(), %err, "file skipped");
				}
				FileOutcome { input: input.to_owned(), result }
			})
			.fold(
				|| BatchReport::new(self.mapping),
				|mut report, outcome| {
					report.record(outcome);
					report
				},
			)
			.reduce(|| BatchReport::new(self.mapping), BatchReport::merge)
	}

	fn outputPath(&self, handler: FileHandler, input: &Path) -> Result<PathBuf, FileError> {
		handler.outputFileName(input).map(|name| self.outputDir.join(name)).ok_or_else(|| {
			io::Error::new(io::ErrorKind::InvalidInput, format!("{input:?} has no file name")).into()
		})
	}

	fn processInto(&self, input: &Path, handler: FileHandler, output: PathBuf) -> Result<FileResult, FileError> {
		if self.isCancelled() {
			return Err(FileError::Cancelled);
		}
		let copied = matches!(handler, FileHandler::Passthrough).then(|| fs::metadata(input)).transpose()?;
		let (bytes, counts) = handler.transform(fs::read(input)?, self.mapping)?;
		self.commit(&output, &bytes, copied.as_ref())?;
		let fileResult = FileResult { input: input.to_owned(), output, handler, counts };
		debug!(input = %input.display(), ?handler, replaced = fileResult.replacedTotal(), "committed");
		Ok(fileResult)
	}

	/// With `source` given, the staged file also takes over its mtime and permissions.
	fn commit(&self, output: &Path, bytes: &[u8], source: Option<&fs::Metadata>) -> Result<(), FileError> {
		let partial = partialPath(output);
		let staged = fs::write(&partial, bytes).and_then(|()| match source {
			Some(metadata) => copyAttributes(&partial, metadata),
			None => Ok(()),
		});
		let committed = staged.map_err(FileError::from).and_then(|()| {
			if self.isCancelled() {
				Err(FileError::Cancelled)
			} else {
				fs::rename(&partial, output).map_err(FileError::from)
			}
		});
		if committed.is_err() {
			_ = fs::remove_file(&partial);
		}
		committed
	}
}

fn copyAttributes(path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
	fs::OpenOptions::new().write(true).open(path)?.set_modified(metadata.modified()?)?;
	fs::set_permissions(path, metadata.permissions())
}

/// Hidden sibling of `output` that holds bytes until they are complete.
#[must_use]
pub fn partialPath(output: &Path) -> PathBuf {
	let mut name = OsString::from(".");
	name.push(output.file_name().unwrap_or_default());
	name.push(PARTIAL_SUFFIX);
	output.with_file_name(name)
}

/// Regular files directly inside `dir`, sorted. Symlinks are followed; subdirectories are not entered.
pub fn scanInputFiles(dir: &Path) -> io::Result<Vec<PathBuf>> {
	let mut files = Vec::new();
	for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
		let entry = entry?;
		if entry.file_type().is_file() {
			files.push(entry.into_path());
		}
	}
	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use {super::*, crate::mapping::buildMappings};

	fn result(name: &str, counts: Option<Vec<usize>>) -> Result<FileResult, FileError> {
		Ok(FileResult {
			input: PathBuf::from(name),
			output: PathBuf::from("out").join(name),
			handler: FileHandler::fromPath(Path::new(name)),
			counts: counts.map(ReplacementCounts::from),
		})
	}

	#[test]
	fn handler_follows_extension() {
		for (name, handler) in [
			("a.svg", FileHandler::Vector),
			("a.SVG", FileHandler::Vector),
			("a.png", FileHandler::Raster(RasterFormat::Png)),
			("a.JPG", FileHandler::Raster(RasterFormat::Jpeg)),
			("a.jpeg", FileHandler::Raster(RasterFormat::Jpeg)),
			("a.bmp", FileHandler::Raster(RasterFormat::Bmp)),
			("a.gif", FileHandler::Raster(RasterFormat::Gif)),
			("a.webp", FileHandler::Passthrough),
			("notes.txt", FileHandler::Passthrough),
			("Makefile", FileHandler::Passthrough),
			(".png", FileHandler::Passthrough),
		] {
			assert_eq!(FileHandler::fromPath(Path::new(name)), handler, "{name}");
		}
	}

	#[test]
	fn raster_output_is_renamed_to_png() {
		let name = |path: &str| {
			let path = Path::new(path);
			FileHandler::fromPath(path).outputFileName(path).unwrap()
		};
		assert_eq!(name("in/photo.JPEG"), "photo.png");
		assert_eq!(name("in/icon.gif"), "icon.png");
		assert_eq!(name("in/logo.svg"), "logo.svg");
		assert_eq!(name("in/readme.md"), "readme.md");
		assert_eq!(FileHandler::Passthrough.outputFileName(Path::new("/")), None);
	}

	#[test]
	fn passthrough_is_byte_identical() {
		let mapping = buildMappings(["#ff00aa=>#000"]).unwrap();
		let bytes = b"#ff00aa \x00\xFF not touched".to_vec();
		let (output, counts) = FileHandler::Passthrough.transform(bytes.clone(), &mapping).unwrap();
		assert_eq!(output, bytes);
		assert_eq!(counts, None);
	}

	#[test]
	fn svg_must_be_utf8() {
		let mapping = buildMappings(["#ff00aa=>#000"]).unwrap();
		let err = FileHandler::Vector.transform(b"<svg fill=\"#ff00aa\">\xFF</svg>".to_vec(), &mapping).unwrap_err();
		assert!(matches!(err, FileError::NotUtf8(_)));
	}

	#[test]
	fn raster_transform_emits_png() {
		let mapping = buildMappings(["#ff00aa=>#000"]).unwrap();
		let mut png = Vec::new();
		Image::filled(2, 3, [0xFF, 0x00, 0xAA, 0xFF]).toPNG(&mut png).unwrap();
		let (output, counts) = FileHandler::Raster(RasterFormat::Png).transform(png, &mapping).unwrap();
		assert_eq!(counts.unwrap().asSlice(), [6]);
		assert_eq!(Image::fromPNG(output.as_slice()).unwrap(), Image::filled(2, 3, [0, 0, 0, 0xFF]));
	}

	#[test]
	fn misnamed_png_still_decodes() {
		let mapping = buildMappings(["#ff00aa=>#000"]).unwrap();
		let mut png = Vec::new();
		Image::filled(2, 2, [0xFF, 0x00, 0xAA, 0xFF]).toPNG(&mut png).unwrap();
		let handler = FileHandler::fromPath(Path::new("photo.jpg"));
		assert_eq!(handler, FileHandler::Raster(RasterFormat::Jpeg));
		let (output, counts) = handler.transform(png, &mapping).unwrap();
		assert_eq!(counts.unwrap().asSlice(), [4]);
		assert_eq!(Image::fromPNG(output.as_slice()).unwrap(), Image::filled(2, 2, [0, 0, 0, 0xFF]));
	}

	#[test]
	fn summary_adds_up_across_files() {
		let mapping = buildMappings(["#111=>#222", "#333=>#444"]).unwrap();
		let mut summary = BatchSummary::new(&mapping);
		summary.record(Path::new("a.png"), &result("a.png", Some(vec![4, 0])));
		summary.record(Path::new("b.svg"), &result("b.svg", Some(vec![0, 0])));
		summary.record(Path::new("c.gif"), &result("c.png", Some(vec![2, 0])));
		assert_eq!(summary.filesProcessed, 3);
		assert_eq!(summary.counts.of(&mapping, "#111"), Some(6));
		let rows: Vec<_> = summary.rows(&mapping).collect();
		assert_eq!(rows, [("#111111", "#222222", 6), ("#333333", "#444444", 0)]);
	}

	#[test]
	fn passthrough_counts_as_processed_but_adds_nothing() {
		let mapping = buildMappings(["#111=>#222"]).unwrap();
		let mut summary = BatchSummary::new(&mapping);
		summary.record(Path::new("notes.txt"), &result("notes.txt", None));
		summary.record(Path::new("broken.png"), &Err(FileError::Cancelled));
		assert_eq!(summary.filesProcessed, 1);
		assert_eq!(summary.counts.asSlice(), [0]);
		assert_eq!(summary.failures, [(PathBuf::from("broken.png"), "cancelled".to_owned())]);
	}

	#[test]
	fn merge_is_plain_addition() {
		let mapping = buildMappings(["#111=>#222", "#333=>#444"]).unwrap();
		let (mut left, mut right) = (BatchSummary::new(&mapping), BatchSummary::new(&mapping));
		left.record(Path::new("a.svg"), &result("a.svg", Some(vec![1, 2])));
		right.record(Path::new("b.svg"), &result("b.svg", Some(vec![3, 4])));
		right.record(Path::new("c.svg"), &Err(FileError::Cancelled));
		let merged = left.clone().merge(right.clone());
		assert_eq!(merged, right.merge(left));
		assert_eq!(merged.counts.asSlice(), [4, 6]);
		assert_eq!(merged.filesProcessed, 2);
		assert_eq!(merged.failures.len(), 1);
	}

	#[test]
	fn summary_serializes_to_toml() {
		let mapping = buildMappings(["#111=>#222", "#333=>#444"]).unwrap();
		let mut summary = BatchSummary::new(&mapping);
		summary.record(Path::new("a.svg"), &result("a.svg", Some(vec![5, 0])));
		summary.record(Path::new("b.png"), &Err(FileError::Cancelled));
		let toml = summary.toTOML(&mapping).unwrap();
		let value: toml::Value = toml::from_str(&toml).unwrap();
		assert_eq!(value["filesProcessed"].as_integer(), Some(1));
		let colors = value["color"].as_array().unwrap();
		assert_eq!(colors.len(), 2);
		assert_eq!(colors[0]["source"].as_str(), Some("#111111"));
		assert_eq!(colors[0]["count"].as_integer(), Some(5));
		assert_eq!(colors[1]["count"].as_integer(), Some(0));
		assert_eq!(value["failure"][0]["error"].as_str(), Some("cancelled"));
	}

	#[test]
	fn partial_path_is_a_hidden_sibling() {
		assert_eq!(partialPath(Path::new("out/a.png")), Path::new("out/.a.png.partial"));
	}
}
