//! Incremental parser for `text/event-stream` chat-completion responses.
//!
//! OpenAI-compatible servers send one JSON chunk per `data:` line and finish
//! with `data: [DONE]`. Only `data` fields matter here; `event`, `id` and
//! comment lines (`: keep-alive`, which OpenRouter sends while a model warms
//! up) are skipped.

/// One complete event from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// The `data` payload. Multi-line payloads are joined with `\n`.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Feeds raw bytes in, yields frames out.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and return every frame it completed.
    ///
    /// Lines are split on raw bytes, so a UTF-8 sequence cut between two
    /// chunks is reassembled before decoding.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(frame) = self.line(line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Emit whatever is left when the connection closes.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw).into_owned();
            let line = line.strip_suffix('\r').unwrap_or(&line).to_owned();
            if let Some(frame) = self.line(&line) {
                return Some(frame);
            }
        }
        self.flush()
    }

    fn line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.flush();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        if field == "data" {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_owned());
        }
        None
    }

    fn flush(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        if payload.trim() == "[DONE]" {
            Some(SseFrame::Done)
        } else {
            Some(SseFrame::Data(payload))
        }
    }
}

/// What one chat-completion chunk contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDelta {
    /// Text delta, if the chunk carried any.
    pub content: Option<String>,
    /// Set on the final chunk of a choice.
    pub finish_reason: Option<String>,
}

/// Pull the first choice's delta out of a chunk payload.
///
/// # Errors
///
/// Returns the JSON error if the payload is not JSON. A provider error
/// object (`{"error": {...}}`) is returned as `Err` with its message.
pub fn parse_chunk(payload: &str) -> Result<ChunkDelta, String> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| format!("invalid stream chunk: {e}"))?;

    if let Some(error) = value.get("error") {
        let message = error["message"].as_str().unwrap_or("unknown provider error");
        return Err(message.to_owned());
    }

    let choice = &value["choices"][0];
    Ok(ChunkDelta {
        content: choice["delta"]["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        finish_reason: choice["finish_reason"].as_str().map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn single_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"a\":1}\n\n");
        assert_eq!(frames, vec![SseFrame::Data("{\"a\":1}".into())]);
    }

    #[test]
    fn done_sentinel() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: [DONE]\n\n");
        assert_eq!(frames, vec![SseFrame::Done]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"te").is_empty());
        assert!(decoder.push(b"xt\":\"x\"}\n").is_empty());
        let frames = decoder.push(b"\n");
        assert_eq!(frames, vec![SseFrame::Data("{\"text\":\"x\"}".into())]);
    }

    #[test]
    fn utf8_split_across_chunks() {
        let payload = "data: canción\n\n".as_bytes();
        // Split inside the two-byte "ó".
        let cut = payload.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&payload[..cut]).is_empty());
        let frames = decoder.push(&payload[cut..]);
        assert_eq!(frames, vec![SseFrame::Data("canción".into())]);
    }

    #[test]
    fn comments_and_other_fields_are_skipped() {
        let mut decoder = SseDecoder::new();
        let frames =
            decoder.push(b": OPENROUTER PROCESSING\n\nevent: message\nid: 7\ndata: hi\n\n");
        assert_eq!(frames, vec![SseFrame::Data("hi".into())]);
    }

    #[test]
    fn crlf_line_endings() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame::Data("one".into()), SseFrame::Data("two".into())]
        );
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: a\ndata: b\n\n");
        assert_eq!(frames, vec![SseFrame::Data("a\nb".into())]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some(SseFrame::Data("tail".into())));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn parse_chunk_content_and_finish() {
        let delta =
            parse_chunk(r#"{"choices":[{"delta":{"content":"Hola"},"finish_reason":null}]}"#)
                .unwrap();
        assert_eq!(delta.content.as_deref(), Some("Hola"));
        assert!(delta.finish_reason.is_none());

        let last = parse_chunk(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert!(last.content.is_none());
        assert_eq!(last.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn parse_chunk_role_only_delta_has_no_content() {
        let delta =
            parse_chunk(r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#).unwrap();
        assert!(delta.content.is_none());
    }

    #[test]
    fn parse_chunk_error_object() {
        let err =
            parse_chunk(r#"{"error":{"message":"Rate limit exceeded","code":429}}"#).unwrap_err();
        assert_eq!(err, "Rate limit exceeded");
    }

    #[test]
    fn parse_chunk_invalid_json() {
        assert!(parse_chunk("not json").is_err());
    }
}
