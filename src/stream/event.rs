use log::{debug, warn};
use serde::Deserialize;

/// Marker that starts every frame carrying a payload.
pub const DATA_MARKER: &str = "data: ";

/// One application event decoded from the answer stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
	/// Next fragment of the answer text.
	ContentDelta {
		/// Text to append.
		text: String,
	},
	/// Backend-side problem, shown inline in the answer.
	ErrorNotice {
		/// Message from the backend.
		text: String,
	},
	/// The answer is complete.
	Completed,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	content: Option<String>,
	#[serde(default)]
	finished: Option<bool>,
}

impl Payload {
	fn into_event(self) -> Option<StreamEvent> {
		if let Some(text) = self.error.filter(|e| !e.is_empty()) {
			Some(StreamEvent::ErrorNotice { text })
		} else if let Some(text) = self.content.filter(|c| !c.is_empty()) {
			Some(StreamEvent::ContentDelta { text })
		} else if self.finished == Some(true) {
			Some(StreamEvent::Completed)
		} else {
			None
		}
	}
}

/// Decode one complete frame.
///
/// Frames without the data marker carry nothing for us and are skipped. A
/// payload that fails to parse is logged and dropped; the parser holds no
/// state, so the next frame is unaffected.
pub fn parse_frame(frame: &str) -> Option<StreamEvent> {
	let Some(data) = frame.strip_prefix(DATA_MARKER) else {
		debug!("ignoring non-data frame ({} bytes)", frame.len());
		return None;
	};
	match serde_json::from_str::<Payload>(data.trim_end()) {
		Ok(payload) => payload.into_event(),
		Err(e) => {
			warn!("dropping malformed stream frame: {}", e);
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn content_frame() {
		assert_eq!(
			parse_frame(r#"data: {"content":"He"}"#),
			Some(StreamEvent::ContentDelta { text: "He".into() })
		);
	}

	#[test]
	fn error_takes_precedence_over_content() {
		assert_eq!(
			parse_frame(r#"data: {"content":"x","error":"knowledge base unavailable"}"#),
			Some(StreamEvent::ErrorNotice {
				text: "knowledge base unavailable".into()
			})
		);
	}

	#[test]
	fn finished_frame() {
		assert_eq!(
			parse_frame("data: {\"finished\":true}\r\n"),
			Some(StreamEvent::Completed)
		);
		assert_eq!(parse_frame(r#"data: {"finished":false}"#), None);
	}

	#[test]
	fn empty_fields_fall_through() {
		assert_eq!(
			parse_frame(r#"data: {"error":"","content":"","finished":true}"#),
			Some(StreamEvent::Completed)
		);
		assert_eq!(parse_frame(r#"data: {}"#), None);
	}

	#[test]
	fn frames_without_marker_are_ignored() {
		assert_eq!(parse_frame(": keep-alive"), None);
		assert_eq!(parse_frame(r#"event: {"content":"x"}"#), None);
		assert_eq!(parse_frame(r#"data:{"content":"x"}"#), None);
	}

	#[test]
	fn malformed_payloads_do_not_affect_later_frames() {
		let frames = [
			r#"data: {"content":"A"}"#,
			r#"data: {"content":"#,
			r#"data: {"content":42}"#,
			"data: not json",
			r#"data: {"content":"B"}"#,
		];
		let events: Vec<_> = frames.iter().filter_map(|f| parse_frame(f)).collect();
		assert_eq!(
			events,
			vec![
				StreamEvent::ContentDelta { text: "A".into() },
				StreamEvent::ContentDelta { text: "B".into() },
			]
		);
	}
}
