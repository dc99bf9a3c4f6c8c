use {
	crate::mapping::{ColorMapping, ReplacementCounts},
	core::ops::RangeInclusive,
	memchr::memchr_iter,
};

/// Hex digits after `#` that make a color literal. The run is taken greedily up to the maximum.
pub const LITERAL_DIGITS: RangeInclusive<usize> = 3..=8;

/// Replaces every `#` + 3..=8 hex digit literal whose canonical form is a mapped source.
/// Unmapped literals and all other text are copied byte for byte.
#[must_use]
pub fn replaceSvg(text: &str, mapping: &ColorMapping) -> (String, ReplacementCounts) {
	let (bytes, mut counts) = (text.as_bytes(), ReplacementCounts::zeroed(mapping));
	let (mut svg, mut copiedUpTo) = (String::with_capacity(text.len()), 0);
	for hashAt in memchr_iter(b'#', bytes) {
		let digitsStart = hashAt + 1;
		let digits = bytes[digitsStart..]
			.iter()
			.take(*LITERAL_DIGITS.end())
			.take_while(|digit| digit.is_ascii_hexdigit())
			.count();
		if !LITERAL_DIGITS.contains(&digits) {
			continue;
		}
		let literalEnd = digitsStart + digits;
		if let Some(i) = mapping.find(&text[hashAt..literalEnd]) {
			svg.push_str(&text[copiedUpTo..hashAt]);
			svg.push_str(&mapping.entries()[i].dest);
			counts.increment(i);
			copiedUpTo = literalEnd;
		}
	}
	svg.push_str(&text[copiedUpTo..]);
	(svg, counts)
}
