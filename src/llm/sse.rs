// ABOUTME: Minimal Server-Sent Events parsing for streaming chat responses.
// ABOUTME: Callers feed complete frames; split frames are buffered by the HTTP client.

use serde_json::Value;

/// A parsed Server-Sent Event. `data` is None for the `[DONE]` sentinel.
#[derive(Debug)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: Option<Value>,
}

/// Parse a chunk of SSE text into events. Events are separated by blank
/// lines; each has optional `event:` and one or more `data:` fields.
pub fn parse_sse_chunk(chunk: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut current_event_type: Option<String> = None;
    let mut current_data = String::new();

    let mut finish = |event_type: Option<String>, data: &mut String| {
        if data.is_empty() {
            return;
        }
        let trimmed = data.trim().to_string();
        let parsed = if trimmed == "[DONE]" {
            None
        } else {
            serde_json::from_str::<Value>(&trimmed).ok()
        };
        events.push(SseEvent {
            event_type,
            data: parsed,
        });
        data.clear();
    };

    for line in chunk.lines() {
        if line.is_empty() {
            finish(current_event_type.take(), &mut current_data);
        } else if let Some(event_type) = line.strip_prefix("event: ") {
            current_event_type = Some(event_type.trim().to_string());
        } else if let Some(data) = line.strip_prefix("data: ") {
            if !current_data.is_empty() {
                current_data.push('\n');
            }
            current_data.push_str(data);
        }
    }

    // Chunk may end without a trailing blank line.
    finish(current_event_type, &mut current_data);

    events
}

/// Split complete SSE frames off the front of `buffer`, leaving any partial
/// trailing frame in place for the next network chunk.
pub fn drain_complete_frames(buffer: &mut String) -> Vec<SseEvent> {
    let mut events = Vec::new();
    while let Some(pos) = buffer.find("\n\n") {
        let frame: String = buffer.drain(..pos + 2).collect();
        events.extend(parse_sse_chunk(&frame));
    }
    events
}
