//! Server-Sent Events decoding
//!
//! Splits a chunked HTTP body into `data:` payloads. Bytes are buffered until
//! a full line arrives, so multi-byte characters split across network chunks
//! survive intact.

/// Incremental `text/event-stream` decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every complete `data:` payload
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }

    /// Bytes waiting for a newline
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"a\":").is_empty());
        assert_eq!(decoder.feed(b"1}\n\ndata: [DONE]\n"), vec!["{\"a\":1}", "[DONE]"]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_ignores_comments_and_crlf() {
        let mut decoder = SseDecoder::new();
        let out = decoder.feed(b": keep-alive\r\nevent: message\r\ndata: x\r\n\r\n");
        assert_eq!(out, vec!["x"]);
    }

    #[test]
    fn test_multibyte_boundary() {
        let mut decoder = SseDecoder::new();
        let text = "data: caf\u{e9}\n".as_bytes();
        let (a, b) = text.split_at(text.len() - 2);
        assert!(decoder.feed(a).is_empty());
        assert_eq!(decoder.feed(b), vec!["caf\u{e9}"]);
    }
}
