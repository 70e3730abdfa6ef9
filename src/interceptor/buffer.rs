use std::fmt;

use serde::Serialize;

use super::decoder::Utf8StreamDecoder;
use super::RequestId;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InterceptPhase {
    AwaitingData,
    Accumulating,
    Finalizing,
    Emitted,
}

impl fmt::Display for InterceptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterceptPhase::AwaitingData => "AWAITING_DATA",
            InterceptPhase::Accumulating => "ACCUMULATING",
            InterceptPhase::Finalizing => "FINALIZING",
            InterceptPhase::Emitted => "EMITTED",
        };
        f.write_str(name)
    }
}

/// Complete body of one response, as received and as decoded.
#[derive(Debug)]
pub struct BufferedBody {
    pub text: String,
    pub raw: Vec<u8>,
    pub decode_failed: bool,
}

/// Per-request accumulation state. Never shared between requests.
#[derive(Debug)]
pub struct ResponseBuffer {
    request_id: RequestId,
    phase: InterceptPhase,
    decoder: Utf8StreamDecoder,
    raw: Vec<u8>,
    text: String,
    chunks: usize,
}

impl ResponseBuffer {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            phase: InterceptPhase::AwaitingData,
            decoder: Utf8StreamDecoder::new(),
            raw: Vec::new(),
            text: String::new(),
            chunks: 0,
        }
    }

    pub fn phase(&self) -> InterceptPhase {
        self.phase
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Append one arriving chunk. Chunks after the body completed are
    /// dropped and reported as `false`.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> bool {
        match self.phase {
            InterceptPhase::AwaitingData | InterceptPhase::Accumulating => {
                self.phase = InterceptPhase::Accumulating;
            }
            InterceptPhase::Finalizing | InterceptPhase::Emitted => {
                log_warn!(
                    "request {}: dropping {} bytes received in phase {}",
                    self.request_id,
                    chunk.len(),
                    self.phase
                );
                return false;
            }
        }

        let errors_before = self.decoder.errors();
        self.raw.extend_from_slice(chunk);
        self.text.push_str(&self.decoder.decode(chunk));
        self.chunks += 1;

        if self.decoder.errors() > errors_before {
            log_warn!(
                "request {}: invalid UTF-8 in chunk {}; body will pass through as received",
                self.request_id,
                self.chunks
            );
        }
        log_debug!(
            "request {}: chunk {} ({} bytes, {} buffered)",
            self.request_id,
            self.chunks,
            chunk.len(),
            self.raw.len()
        );
        true
    }

    /// Transport signalled end of body. Takes the buffered content out.
    pub fn finalize(&mut self) -> BufferedBody {
        self.text.push_str(&self.decoder.finish());
        self.phase = InterceptPhase::Finalizing;

        BufferedBody {
            text: std::mem::take(&mut self.text),
            raw: std::mem::take(&mut self.raw),
            decode_failed: self.decoder.had_errors(),
        }
    }

    pub fn mark_emitted(&mut self) {
        self.phase = InterceptPhase::Emitted;
    }
}
