use super::message::{ConversationId, Message, MessageId, Role};
use crate::stream::AnswerSnapshot;

/// Messages of the conversation currently on screen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
	conversation: Option<ConversationId>,
	messages: Vec<Message>,
}

impl Transcript {
	/// Transcript of `conversation` starting from its stored history.
	pub fn new(conversation: ConversationId, messages: Vec<Message>) -> Self {
		Self {
			conversation: Some(conversation),
			messages,
		}
	}

	/// Conversation on screen; `None` before one is selected.
	pub fn conversation(&self) -> Option<ConversationId> {
		self.conversation
	}

	/// Messages in display order.
	pub fn messages(&self) -> &[Message] {
		&self.messages
	}

	/// Whether nothing is shown yet.
	pub fn is_empty(&self) -> bool {
		self.messages.is_empty()
	}

	/// Message with the given id.
	pub fn get(&self, id: MessageId) -> Option<&Message> {
		self.messages.iter().find(|m| m.id == id)
	}

	/// Append the two messages of a freshly opened turn.
	pub fn begin_turn(&mut self, user: Message, placeholder: Message) {
		self.messages.push(user);
		self.messages.push(placeholder);
	}

	/// Write an answer snapshot into its placeholder.
	///
	/// Returns `false` when the placeholder is not part of this transcript,
	/// e.g. because the user switched conversations while the answer was
	/// still streaming. Such snapshots are dropped.
	pub fn apply(&mut self, snapshot: &AnswerSnapshot) -> bool {
		match self.messages.iter_mut().find(|m| m.id == snapshot.message_id) {
			Some(message) => {
				message.content.clone_from(&snapshot.content);
				true
			}
			None => false,
		}
	}
}

/// The question an answer responds to: the closest user message before it,
/// or the latest user message when the answer is not in `messages`.
pub fn question_for(messages: &[Message], answer: MessageId) -> Option<&str> {
	let end = messages
		.iter()
		.position(|m| m.id == answer)
		.unwrap_or(messages.len());
	messages[..end]
		.iter()
		.rev()
		.find(|m| m.role == Role::User)
		.map(|m| m.content.as_str())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snapshot(id: i64, content: &str) -> AnswerSnapshot {
		AnswerSnapshot {
			message_id: MessageId(id),
			content: content.to_string(),
		}
	}

	#[test]
	fn snapshots_update_their_placeholder() {
		let mut transcript = Transcript::new(ConversationId(1), Vec::new());
		transcript.begin_turn(
			Message::user(MessageId(10), "what treats a cold?"),
			Message::placeholder(MessageId(11)),
		);

		assert!(transcript.apply(&snapshot(11, "Gin")));
		assert!(transcript.apply(&snapshot(11, "Ginger")));
		assert_eq!(transcript.get(MessageId(11)).unwrap().content, "Ginger");
		assert_eq!(
			transcript.get(MessageId(10)).unwrap().content,
			"what treats a cold?"
		);
	}

	#[test]
	fn snapshots_for_another_conversation_are_dropped() {
		let mut old = Transcript::new(ConversationId(1), Vec::new());
		old.begin_turn(
			Message::user(MessageId(10), "q"),
			Message::placeholder(MessageId(11)),
		);

		// The user switched away; the new transcript has unrelated messages.
		let mut current = Transcript::new(
			ConversationId(2),
			vec![Message::user(MessageId(3), "other question")],
		);
		let before = current.clone();
		assert!(!current.apply(&snapshot(11, "late answer")));
		assert_eq!(current, before);
	}

	#[test]
	fn question_is_the_user_message_before_the_answer() {
		let history = vec![
			Message::user(MessageId(1), "first"),
			Message::placeholder(MessageId(2)),
			Message::user(MessageId(3), "second"),
			Message::placeholder(MessageId(4)),
		];
		assert_eq!(question_for(&history, MessageId(2)), Some("first"));
		assert_eq!(question_for(&history, MessageId(4)), Some("second"));
		assert_eq!(question_for(&history, MessageId(99)), Some("second"));
		assert_eq!(question_for(&history[1..2], MessageId(99)), None);
	}
}
