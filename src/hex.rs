//! Hex color text: canonical form is `#` + 6 or 8 lowercase hex digits,
//! fully opaque colors never carrying the alpha pair.

use crate::{error::MappingError, Rgba, RGBA_SIZE};

pub const HEX_PREFIX: char = '#';

/// Trims, lowercases, prefixes `#` and expands `#rgb`/`#rgba` shorthand by doubling every digit.
/// Digits and final length are left unchecked; see [`isValidHex`].
#[must_use]
pub fn normalize(raw: &str) -> String {
	let lowered = raw.trim().to_lowercase();
	let digits = lowered.strip_prefix(HEX_PREFIX).unwrap_or(&lowered);
	let mut hex = String::with_capacity(1 + 2 * digits.len());
	hex.push(HEX_PREFIX);
	match digits.chars().count() {
		3 | 4 => {
			for digit in digits.chars() {
				hex.push(digit);
				hex.push(digit);
			}
		}
		_ => hex.push_str(digits),
	}
	hex
}

#[must_use]
pub fn isValidHex(hex: &str) -> bool {
	hex.strip_prefix(HEX_PREFIX).map_or(false, |digits| {
		matches!(digits.len(), 6 | 8) && digits.bytes().all(|digit| matches!(digit, b'0'..=b'9' | b'a'..=b'f'))
	})
}

pub fn hexToRgba(hex: &str) -> Result<Rgba, MappingError> {
	let digits = hex.trim_start_matches(HEX_PREFIX).as_bytes();
	if !matches!(digits.len(), 6 | 8) {
		return Err(MappingError::UnexpectedHexLength(hex.to_owned()));
	}
	let nibble = |digit: u8| (digit as char).to_digit(16).map(|value| value as u8);
	let mut rgba = [u8::MAX; RGBA_SIZE];
	for (channel, pair) in rgba.iter_mut().zip(digits.chunks_exact(2)) {
		*channel = match (nibble(pair[0]), nibble(pair[1])) {
			(Some(high), Some(low)) => high << 4 | low,
			_ => return Err(MappingError::InvalidColorValue(hex.to_owned())),
		};
	}
	Ok(rgba)
}

#[must_use]
pub fn rgbaToHex([red, green, blue, alpha]: Rgba) -> String {
	if alpha == u8::MAX {
		format!("#{red:02x}{green:02x}{blue:02x}")
	} else {
		format!("#{red:02x}{green:02x}{blue:02x}{alpha:02x}")
	}
}

/// Normalizes and validates `raw`, yielding its channels. `#rrggbbff` and `#rrggbb` land on the same color.
#[must_use]
pub fn canonicalize(raw: &str) -> Option<Rgba> {
	let hex = normalize(raw);
	if isValidHex(&hex) {
		hexToRgba(&hex).ok()
	} else {
		None
	}
}
