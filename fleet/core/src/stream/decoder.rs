//! Incremental UTF-8 Decoding
//!
//! Transports hand us arbitrary byte slices. A multi-byte character can be
//! split across two chunks, so decoding each chunk on its own would corrupt
//! it. `Utf8Decoder` holds back an incomplete trailing sequence until the
//! next chunk completes it.

/// Streaming UTF-8 decoder
///
/// Invalid sequences decode to U+FFFD. Incomplete trailing bytes are carried
/// into the next call to [`Utf8Decoder::decode`] and flushed lossily by
/// [`Utf8Decoder::finish`].
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with nothing held back
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether bytes of an incomplete character are held back
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Decode the next chunk
    ///
    /// Returns all text that is complete after this chunk. May be empty if
    /// the chunk only contained part of a character.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let joined;
        let mut rest: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(bytes);
            joined = buf;
            &joined
        };

        let mut out = String::with_capacity(rest.len());
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end of input
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush whatever is held back at end of stream
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"Step 1/4 : FROM node:20"), "Step 1/4 : FROM node:20");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_character_split_across_chunks() {
        // "é" is 0xC3 0xA9, "✓" is 0xE2 0x9C 0x93
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"caf\xC3"), "caf");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(b"\xA9 \xE2"), "é ");
        assert_eq!(decoder.decode(b"\x9C"), "");
        assert_eq!(decoder.decode(b"\x93 done"), "✓ done");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"ok\xFFok"), "ok\u{FFFD}ok");
    }

    #[test]
    fn test_finish_flushes_truncated_tail() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"end\xE2\x9C"), "end");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }
}
