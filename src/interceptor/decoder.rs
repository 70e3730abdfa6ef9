/// Incremental UTF-8 decoder that carries split multi-byte sequences over
/// chunk boundaries.
///
/// Invalid sequences decode to U+FFFD and are counted; the caller decides
/// what a lossy body means for it.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    errors: usize,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, holding back a trailing incomplete sequence.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` guarantees this prefix is well-formed.
                    out.push_str(&String::from_utf8_lossy(valid));

                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.errors += 1;
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of stream. A dangling partial sequence is an error.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        self.errors += 1;
        char::REPLACEMENT_CHARACTER.to_string()
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn had_errors(&self) -> bool {
        self.errors > 0
    }
}
