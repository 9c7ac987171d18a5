//! Upstream Server-Sent Events decoding
//!
//! Providers stream completions as `text/event-stream`. Network chunks do
//! not respect line or event boundaries (or UTF-8 boundaries), so bytes are
//! buffered until a full line is available and `data:` lines are joined
//! until the blank line that ends the event.

use futures::StreamExt;

use super::{ErrorClassifier, LlmError, TextStream};

/// OpenAI-style end-of-stream sentinel
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental `text/event-stream` decoder yielding event data payloads
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed raw bytes; returns the data of every event completed by them
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.process_line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    /// Flush a trailing event the upstream did not terminate with a blank line
    pub(crate) fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let line: Vec<u8> = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&line);
            self.process_line(line.trim_end_matches('\r'), &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // event:, id: and retry: fields carry nothing the adapters need
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
    }
}

/// Turn a successful streaming response into a stream of text deltas.
///
/// `parse` maps one event payload to an optional delta. The stream ends at
/// the `[DONE]` sentinel or when the body ends; a transport or parse error
/// is yielded once and ends the stream.
pub(crate) fn delta_stream<F>(response: reqwest::Response, provider: String, parse: F) -> TextStream
where
    F: Fn(&str) -> Result<Option<String>, LlmError> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut decoder = SseDecoder::default();
        let mut bytes = response.bytes_stream();
        let mut finished = false;

        while !finished {
            let events = match bytes.next().await {
                Some(Ok(chunk)) => decoder.push(&chunk),
                Some(Err(e)) => {
                    yield Err(ErrorClassifier::classify_transport(&e, &provider));
                    return;
                }
                None => {
                    finished = true;
                    decoder.finish()
                }
            };

            for data in events {
                if data.trim() == DONE_SENTINEL {
                    return;
                }
                match parse(&data) {
                    Ok(Some(delta)) if !delta.is_empty() => yield Ok(delta),
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(e.provider(provider.clone()));
                        return;
                    }
                }
            }
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: {\"a\":1}\n\n");
        assert_eq!(events, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: hel").is_empty());
        assert!(decoder.push(b"lo\r\n").is_empty());
        let events = decoder.push(b"\r\ndata: next\n\n");
        assert_eq!(events, vec!["hello".to_string(), "next".to_string()]);
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\nevent: delta\ndata: one\ndata: two\n\n");
        assert_eq!(events, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn test_multibyte_char_split_between_chunks() {
        let text = "data: £50\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC2).unwrap() + 1;

        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&text[..split]).is_empty());
        let events = decoder.push(&text[split..]);
        assert_eq!(events, vec!["£50".to_string()]);
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec!["tail".to_string()]);
        assert!(decoder.finish().is_empty());
    }
}
