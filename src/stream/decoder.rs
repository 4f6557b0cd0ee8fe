/// Separator between two records of the answer stream.
pub const FRAME_SEPARATOR: &str = "\n\n";

/// Incremental decoder turning arbitrarily split byte chunks into complete
/// text frames.
///
/// Bytes of a UTF-8 sequence cut by a chunk boundary are held back until the
/// next chunk completes them. Text without a trailing separator stays in
/// `pending` and is dropped by [`FrameDecoder::finish`].
#[derive(Debug, Default)]
pub struct FrameDecoder {
	pending: String,
	partial: Vec<u8>,
}

impl FrameDecoder {
	/// Decoder with nothing buffered.
	pub fn new() -> Self {
		Self::default()
	}

	/// Feed one chunk and return every frame it completed, in order.
	pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
		if self.partial.is_empty() {
			self.decode_into_pending(chunk);
		} else {
			let mut joined = std::mem::take(&mut self.partial);
			joined.extend_from_slice(chunk);
			self.decode_into_pending(&joined);
		}
		self.drain_frames()
	}

	/// End of input. Unterminated text is discarded rather than turned into a
	/// frame; the number of discarded bytes is returned for logging.
	pub fn finish(&mut self) -> usize {
		let dropped = self.pending.len() + self.partial.len();
		self.pending.clear();
		self.partial.clear();
		dropped
	}

	/// Text received but not yet terminated by a separator.
	pub fn pending(&self) -> &str {
		&self.pending
	}

	fn decode_into_pending(&mut self, mut bytes: &[u8]) {
		loop {
			match std::str::from_utf8(bytes) {
				Ok(text) => {
					self.pending.push_str(text);
					return;
				}
				Err(err) => {
					let (valid, rest) = bytes.split_at(err.valid_up_to());
					self.pending
						.push_str(std::str::from_utf8(valid).unwrap_or_default());
					match err.error_len() {
						Some(len) => {
							self.pending.push(char::REPLACEMENT_CHARACTER);
							bytes = &rest[len..];
						}
						None => {
							// Incomplete sequence at the end of the chunk.
							self.partial.extend_from_slice(rest);
							return;
						}
					}
				}
			}
		}
	}

	fn drain_frames(&mut self) -> Vec<String> {
		let mut frames = Vec::new();
		let mut start = 0;
		while let Some(offset) = self.pending[start..].find(FRAME_SEPARATOR) {
			let end = start + offset;
			if end > start {
				frames.push(self.pending[start..end].to_string());
			}
			start = end + FRAME_SEPARATOR.len();
		}
		if start > 0 {
			self.pending.drain(..start);
		}
		frames
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn decode_all(chunks: &[&[u8]]) -> Vec<String> {
		let mut decoder = FrameDecoder::new();
		chunks.iter().flat_map(|c| decoder.push(c)).collect()
	}

	#[test]
	fn splits_on_blank_line_and_keeps_remainder() {
		let mut decoder = FrameDecoder::new();
		let frames = decoder.push(b"data: {\"content\":\"a\"}\n\ndata: {\"con");
		assert_eq!(frames, vec!["data: {\"content\":\"a\"}".to_string()]);
		assert_eq!(decoder.pending(), "data: {\"con");

		let frames = decoder.push(b"tent\":\"b\"}\n\n");
		assert_eq!(frames, vec!["data: {\"content\":\"b\"}".to_string()]);
		assert!(decoder.pending().is_empty());
	}

	#[test]
	fn separator_split_across_chunks() {
		let frames = decode_all(&[
			b"data: 1\n".as_slice(),
			b"\ndata: 2\n".as_slice(),
			b"\n".as_slice(),
		]);
		assert_eq!(frames, vec!["data: 1", "data: 2"]);
	}

	#[test]
	fn multibyte_character_split_across_chunks() {
		let text = "data: {\"content\":\"当归\"}\n\n".as_bytes();
		// Split inside the first three-byte character.
		let cut = text.iter().position(|&b| b >= 0x80).unwrap() + 1;
		let frames = decode_all(&[&text[..cut], &text[cut..]]);
		assert_eq!(frames, vec!["data: {\"content\":\"当归\"}"]);
	}

	#[test]
	fn invalid_bytes_become_replacement_characters() {
		let frames = decode_all(&[b"data: a\xffb\n\n".as_slice()]);
		assert_eq!(frames, vec!["data: a\u{fffd}b"]);
	}

	#[test]
	fn empty_frames_are_skipped() {
		let frames = decode_all(&[b"\n\n\n\ndata: x\n\n\n\n".as_slice()]);
		assert_eq!(frames, vec!["data: x"]);
	}

	#[test]
	fn finish_discards_unterminated_frame() {
		let mut decoder = FrameDecoder::new();
		assert!(decoder.push(b"data: {\"finished\":true}").is_empty());
		assert_eq!(decoder.finish(), "data: {\"finished\":true}".len());
		assert!(decoder.pending().is_empty());
	}

	proptest! {
		#[test]
		fn chunking_does_not_change_frames(
			parts in proptest::collection::vec("[a-z当归 {}\":]{0,12}", 0..8),
			cuts in proptest::collection::vec(0usize..400, 0..12),
		) {
			let mut stream = String::new();
			for part in &parts {
				stream.push_str("data: ");
				stream.push_str(part);
				stream.push_str(FRAME_SEPARATOR);
			}
			stream.push_str("data: tail");
			let bytes = stream.as_bytes();

			let whole = decode_all(&[bytes]);

			let mut points: Vec<usize> = cuts.into_iter().map(|c| c % (bytes.len() + 1)).collect();
			points.sort_unstable();
			let mut chunks = Vec::new();
			let mut last = 0;
			for p in points {
				chunks.push(&bytes[last..p]);
				last = p;
			}
			chunks.push(&bytes[last..]);

			prop_assert_eq!(decode_all(&chunks), whole);
		}
	}
}
