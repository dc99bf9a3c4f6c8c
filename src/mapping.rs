use {
	crate::{
		error::MappingError,
		hex::{canonicalize, rgbaToHex},
		Rgba,
	},
	std::collections::HashMap,
	tracing::debug,
};

pub const ARROW_SEPARATOR: &str = "=>";
pub const COLON_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
	pub source: String,
	pub dest: String,
	pub sourceRgba: Rgba,
	pub destRgba: Rgba,
}

impl Entry {
	/// Parses `SRC=>DST`, falling back to `SRC:DST` only when there is no `=>`.
	pub fn parse(spec: &str) -> Result<Self, MappingError> {
		let (source, dest) = spec
			.split_once(ARROW_SEPARATOR)
			.or_else(|| spec.split_once(COLON_SEPARATOR))
			.ok_or_else(|| MappingError::InvalidMappingSyntax(spec.to_owned()))?;
		match (canonicalize(source), canonicalize(dest)) {
			(Some(sourceRgba), Some(destRgba)) => Ok(Self {
				source: rgbaToHex(sourceRgba),
				dest: rgbaToHex(destRgba),
				sourceRgba,
				destRgba,
			}),
			_ => Err(MappingError::InvalidColorValue(spec.to_owned())),
		}
	}
}

/// Source→dest table keyed by canonical source text, kept in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorMapping {
	entries: Vec<Entry>,
	indices: HashMap<String, usize>,
}

impl ColorMapping {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Overwrites the dest of an existing source in place; new sources go last.
	pub fn insert(&mut self, entry: Entry) -> usize {
		if let Some(&i) = self.indices.get(&entry.source) {
			debug!(source = %entry.source, old = %self.entries[i].dest, new = %entry.dest, "mapping overwritten");
			self.entries[i] = entry;
			i
		} else {
			let i = self.entries.len();
			self.indices.insert(entry.source.clone(), i);
			self.entries.push(entry);
			i
		}
	}

	pub fn insertSpec(&mut self, spec: &str) -> Result<&Entry, MappingError> {
		let i = self.insert(Entry::parse(spec)?);
		Ok(&self.entries[i])
	}

	pub fn extend(&mut self, other: Self) {
		for entry in other.entries {
			self.insert(entry);
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn isEmpty(&self) -> bool {
		self.entries.is_empty()
	}

	#[must_use]
	pub fn entries(&self) -> &[Entry] {
		&self.entries
	}

	/// Exact lookup by canonical source text.
	#[must_use]
	pub fn indexOf(&self, source: &str) -> Option<usize> {
		self.indices.get(source).copied()
	}

	#[must_use]
	pub fn get(&self, source: &str) -> Option<&str> {
		self.indexOf(source).map(|i| self.entries[i].dest.as_str())
	}

	/// Lookup of any accepted spelling of a color, e.g. `#F0A` for the key `#ff00aa`.
	#[must_use]
	pub fn find(&self, raw: &str) -> Option<usize> {
		canonicalize(raw).and_then(|rgba| self.indexOf(&rgbaToHex(rgba)))
	}
}

pub fn buildMappings<I>(specs: I) -> Result<ColorMapping, MappingError>
where
	I: IntoIterator,
	I::Item: AsRef<str>,
{
	let mut mapping = ColorMapping::new();
	for spec in specs {
		mapping.insertSpec(spec.as_ref())?;
	}
	Ok(mapping)
}

/// Per-key counters, index-parallel to [`ColorMapping::entries`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementCounts(Vec<usize>);

impl ReplacementCounts {
	#[must_use]
	pub fn zeroed(mapping: &ColorMapping) -> Self {
		Self(vec![0; mapping.len()])
	}

	pub fn increment(&mut self, i: usize) {
		self.0[i] += 1;
	}

	#[must_use]
	pub fn get(&self, i: usize) -> usize {
		self.0.get(i).copied().unwrap_or_default()
	}

	#[must_use]
	pub fn of(&self, mapping: &ColorMapping, source: &str) -> Option<usize> {
		mapping.find(source).map(|i| self.get(i))
	}

	#[must_use]
	pub fn total(&self) -> usize {
		self.0.iter().sum()
	}

	#[must_use]
	pub fn asSlice(&self) -> &[usize] {
		&self.0
	}

	pub fn add(&mut self, other: &Self) {
		if self.0.len() < other.0.len() {
			self.0.resize(other.0.len(), 0);
		}
		for (count, &other) in self.0.iter_mut().zip(other.0.iter()) {
			*count += other;
		}
	}
}

impl From<Vec<usize>> for ReplacementCounts {
	fn from(counts: Vec<usize>) -> Self {
		Self(counts)
	}
}
