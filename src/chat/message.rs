use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side conversation id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

/// Message id, either assigned by the server or generated locally for a live turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for ConversationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl fmt::Display for MessageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// Author of a message. The backend stores answers under the `system` role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	/// Question typed by the user.
	User,
	/// Answer produced by the backend.
	#[serde(alias = "system")]
	Assistant,
}

/// One entry of a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
	/// Server id, or a locally generated one while the turn is live.
	pub id: MessageId,
	/// Who wrote it.
	pub role: Role,
	/// Text; Markdown for answers.
	pub content: String,
	/// Creation time. The backend sends SQLite timestamps without a zone.
	#[serde(rename = "timestamp", default = "Utc::now", deserialize_with = "lenient_timestamp")]
	pub created_at: DateTime<Utc>,
}

impl Message {
	/// Question as typed by the user, stamped now.
	pub fn user(id: MessageId, content: impl Into<String>) -> Self {
		Self {
			id,
			role: Role::User,
			content: content.into(),
			created_at: Utc::now(),
		}
	}

	/// Empty assistant message that a streaming answer is written into.
	pub fn placeholder(id: MessageId) -> Self {
		Self {
			id,
			role: Role::Assistant,
			content: String::new(),
			created_at: Utc::now(),
		}
	}
}

// The history endpoint returns SQLite timestamps (`2024-05-01 10:00:00`)
// without an offset; anything unreadable falls back to "now".
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;
	Ok(raw
		.and_then(|s| {
			DateTime::parse_from_rfc3339(&s)
				.map(|dt| dt.with_timezone(&Utc))
				.ok()
				.or_else(|| {
					chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
						.ok()
						.map(|naive| naive.and_utc())
				})
		})
		.unwrap_or_else(Utc::now))
}

/// Generates message ids for live turns from the millisecond clock, never
/// handing out the same id twice.
#[derive(Debug, Default)]
pub struct MessageIds {
	last: i64,
}

impl MessageIds {
	/// Generator that starts at the current time.
	pub fn new() -> Self {
		Self::default()
	}

	/// Next id, strictly greater than every id handed out before.
	pub fn next(&mut self) -> MessageId {
		self.next_at(Utc::now().timestamp_millis())
	}

	fn next_at(&mut self, now_ms: i64) -> MessageId {
		self.last = now_ms.max(self.last + 1);
		MessageId(self.last)
	}
}

/// Entry of the conversation sidebar.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ConversationSummary {
	/// Conversation id.
	pub id: ConversationId,
	/// Name given by the user, if any.
	#[serde(default)]
	pub name: Option<String>,
	/// Opening message, used as a title when there is no name.
	#[serde(default)]
	pub first_message: Option<String>,
}

impl ConversationSummary {
	/// Display title: explicit name, else the opening message, else a default.
	pub fn title(&self) -> String {
		self.name
			.as_deref()
			.filter(|n| !n.trim().is_empty())
			.or(self.first_message.as_deref())
			.map(|t| t.chars().take(40).collect())
			.unwrap_or_else(|| "New conversation".to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_strictly_increasing() {
		let mut ids = MessageIds::new();
		let a = ids.next_at(1_000);
		let b = ids.next_at(1_000);
		let c = ids.next_at(999);
		let d = ids.next_at(5_000);
		assert_eq!(
			(a, b, c, d),
			(MessageId(1_000), MessageId(1_001), MessageId(1_002), MessageId(5_000))
		);
	}

	#[test]
	fn history_message_with_system_role() {
		let json = r#"{"id": 7, "role": "system", "content": "answer", "timestamp": "2024-05-01 10:00:00"}"#;
		let msg: Message = serde_json::from_str(json).unwrap();
		assert_eq!(msg.id, MessageId(7));
		assert_eq!(msg.role, Role::Assistant);
		assert_eq!(msg.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
	}

	#[test]
	fn missing_timestamp_defaults_to_now() {
		let msg: Message =
			serde_json::from_str(r#"{"id": 1, "role": "user", "content": "hi"}"#).unwrap();
		assert_eq!(msg.role, Role::User);
		assert!(msg.created_at <= Utc::now());
	}

	#[test]
	fn summary_title_prefers_name() {
		let named = ConversationSummary {
			id: ConversationId(1),
			name: Some("Herbs".into()),
			first_message: Some("what is ginseng".into()),
		};
		assert_eq!(named.title(), "Herbs");

		let unnamed = ConversationSummary {
			name: Some("  ".into()),
			..named.clone()
		};
		assert_eq!(unnamed.title(), "what is ginseng");

		let empty = ConversationSummary {
			id: ConversationId(2),
			name: None,
			first_message: None,
		};
		assert_eq!(empty.title(), "New conversation");
	}
}
