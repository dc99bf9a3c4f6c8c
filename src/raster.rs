use {
	crate::{
		error::FileError,
		mapping::{ColorMapping, ReplacementCounts},
		Rgba, RGBA_SIZE, RGB_SIZE,
	},
	png::{BitDepth, ColorType, Transformations},
	rayon::prelude::*,
	std::{
		collections::HashMap,
		io::{Read, Write},
	},
};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
	Png,
	Jpeg,
	Bmp,
	Gif,
}

impl RasterFormat {
	/// Case-insensitive, without the leading dot.
	#[must_use]
	pub fn fromExtension(extension: &str) -> Option<Self> {
		Some(match extension.to_ascii_lowercase().as_str() {
			"png" => Self::Png,
			"jpg" | "jpeg" => Self::Jpeg,
			"bmp" => Self::Bmp,
			"gif" => Self::Gif,
			_ => return None,
		})
	}

	/// Recognizes the format from the leading bytes.
	#[must_use]
	pub fn sniff(bytes: &[u8]) -> Option<Self> {
		if bytes.starts_with(&PNG_SIGNATURE) {
			return Some(Self::Png);
		}
		match image::guess_format(bytes).ok()? {
			image::ImageFormat::Jpeg => Some(Self::Jpeg),
			image::ImageFormat::Bmp => Some(Self::Bmp),
			image::ImageFormat::Gif => Some(Self::Gif),
			_ => None,
		}
	}

	fn imageFormat(self) -> image::ImageFormat {
		match self {
			Self::Png => image::ImageFormat::Png,
			Self::Jpeg => image::ImageFormat::Jpeg,
			Self::Bmp => image::ImageFormat::Bmp,
			Self::Gif => image::ImageFormat::Gif,
		}
	}
}

/// Row-major RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
	pub width: usize,
	pub height: usize,
	pub data: Box<[u8]>,
}

impl Image {
	#[must_use]
	pub fn fromWidthHeight(width: usize, height: usize) -> Self {
		Self { width, height, data: vec![0; width * height * RGBA_SIZE].into_boxed_slice() }
	}

	#[must_use]
	pub fn filled(width: usize, height: usize, rgba: Rgba) -> Self {
		Self { width, height, data: rgba.repeat(width * height).into_boxed_slice() }
	}

	#[inline]
	fn offset(&self, x: usize, y: usize) -> usize {
		assert!(x < self.width && y < self.height, "pixel ({x}, {y}) outside {}x{}", self.width, self.height);
		(y * self.width + x) * RGBA_SIZE
	}

	#[must_use]
	pub fn getPixel(&self, x: usize, y: usize) -> Rgba {
		let offset = self.offset(x, y);
		let mut rgba = Rgba::default();
		rgba.copy_from_slice(&self.data[offset..][..RGBA_SIZE]);
		rgba
	}

	pub fn setPixel(&mut self, x: usize, y: usize, rgba: Rgba) {
		let offset = self.offset(x, y);
		self.data[offset..][..RGBA_SIZE].copy_from_slice(&rgba);
	}

	/// Palette, grayscale, low-bit and 16-bit PNGs all come out as RGBA8; missing alpha reads as opaque.
	pub fn fromPNG<R: Read>(reader: R) -> Result<Self, FileError> {
		let mut decoder = png::Decoder::new(reader);
		decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
		let png = &mut decoder.read_info()?;
		let mut buffer = vec![0; png.output_buffer_size()];
		let info = png.next_frame(&mut buffer)?;
		buffer.truncate(info.buffer_size());
		if info.bit_depth != BitDepth::Eight {
			return Err(FileError::UnsupportedPngLayout(info.color_type, info.bit_depth));
		}
		let data: Vec<u8> = match info.color_type {
			ColorType::Rgba => buffer,
			ColorType::Rgb => {
				buffer.chunks_exact(RGB_SIZE).flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX]).collect()
			}
			ColorType::GrayscaleAlpha => {
				buffer.chunks_exact(2).flat_map(|luma| [luma[0], luma[0], luma[0], luma[1]]).collect()
			}
			ColorType::Grayscale => buffer.iter().flat_map(|&luma| [luma, luma, luma, u8::MAX]).collect(),
			colorType => return Err(FileError::UnsupportedPngLayout(colorType, info.bit_depth)),
		};
		Ok(Self { width: info.width as _, height: info.height as _, data: data.into_boxed_slice() })
	}

	/// The content's magic bytes pick the codec; `format` is only used when they are unrecognized.
	pub fn decode(bytes: &[u8], format: RasterFormat) -> Result<Self, FileError> {
		let format = RasterFormat::sniff(bytes).unwrap_or(format);
		if format == RasterFormat::Png {
			return Self::fromPNG(bytes);
		}
		let rgba = image::load_from_memory_with_format(bytes, format.imageFormat())?.into_rgba8();
		let (width, height) = rgba.dimensions();
		Ok(Self { width: width as _, height: height as _, data: rgba.into_raw().into_boxed_slice() })
	}

	/// Always RGBA8, so alpha survives whatever the input format was.
	pub fn toPNG<W: Write>(&self, writer: W) -> Result<(), FileError> {
		let mut png = png::Encoder::new(writer, self.width as _, self.height as _);
		png.set_color(ColorType::Rgba);
		png.set_depth(BitDepth::Eight);
		let mut writer = png.write_header()?;
		writer.write_image_data(&self.data)?;
		writer.finish()?;
		Ok(())
	}
}

/// Overwrites every pixel exactly equal to a mapped source with its dest, counting per source.
/// Rows are spread over the rayon pool; each row is only touched by one worker.
pub fn replaceRaster(image: &mut Image, mapping: &ColorMapping) -> ReplacementCounts {
	let entries = mapping.entries();
	let lookup: HashMap<Rgba, usize> =
		entries.iter().enumerate().map(|(i, entry)| (entry.sourceRgba, i)).collect();
	let rowLen = image.width * RGBA_SIZE;
	if lookup.is_empty() || rowLen == 0 {
		return ReplacementCounts::zeroed(mapping);
	}
	image
		.data
		.par_chunks_mut(rowLen)
		.fold(
			|| ReplacementCounts::zeroed(mapping),
			|mut counts, row| {
				for pixel in row.chunks_exact_mut(RGBA_SIZE) {
					if let Some(&i) = lookup.get(&*pixel) {
						pixel.copy_from_slice(&entries[i].destRgba);
						counts.increment(i);
					}
				}
				counts
			},
		)
		.reduce(
			|| ReplacementCounts::zeroed(mapping),
			|mut counts, other| {
				counts.add(&other);
				counts
			},
		)
}
