use std::future::Future;

use futures::{Stream, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;

use super::decoder::FrameDecoder;
use super::event::{StreamEvent, parse_frame};
use crate::chat::{ConversationId, Message, MessageId, MessageIds};
use crate::error::{Error, Result};

/// Shown in place of the answer when the connection fails before any text
/// arrived.
pub const FAILED_ANSWER_TEXT: &str = "Failed to send the message, please try again.";

/// Lifecycle of one question/answer turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnState {
	/// No turn started yet.
	#[default]
	Idle,
	/// Question submitted, waiting for the stream to open.
	Sending,
	/// Answer text is arriving.
	Streaming,
	/// The backend signalled the end of the answer.
	Completed,
	/// The turn ended without completion.
	Failed,
}

impl TurnState {
	/// A new question may only start once the previous turn has ended.
	pub fn accepts_submit(self) -> bool {
		matches!(self, TurnState::Idle | TurnState::Completed | TurnState::Failed)
	}

	/// Whether the turn is over.
	pub fn is_terminal(self) -> bool {
		matches!(self, TurnState::Completed | TurnState::Failed)
	}
}

/// Body of `POST /api/stream`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreamRequest {
	/// The question.
	pub message: String,
	/// Conversation the question belongs to.
	pub conversation_id: ConversationId,
}

/// Body of `POST /api/knowledge-graph`, issued once an answer is complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphRequest {
	/// Question the answer responded to.
	pub query: String,
	/// Conversation of the answer.
	pub conversation_id: ConversationId,
	/// Id of the answer message.
	pub message_id: MessageId,
}

/// Immutable copy of the answer so far, addressed to its placeholder message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerSnapshot {
	/// Placeholder the answer is written into.
	pub message_id: MessageId,
	/// Whole answer text so far.
	pub content: String,
}

/// Receiver of everything a turn produces. Implemented by the chat page,
/// and by recorders in tests.
pub trait TurnSink {
	/// The stream opened: show the question and the empty answer.
	fn begin_turn(&mut self, user: Message, placeholder: Message);
	/// The answer changed.
	fn publish(&mut self, snapshot: AnswerSnapshot);
	/// The answer is complete; fetch its graph without blocking the turn.
	fn request_graph(&mut self, request: GraphRequest);
	/// Called on every state transition.
	fn state_changed(&mut self, _state: TurnState) {}
}

/// Drives a single turn from submit to a terminal state and owns the
/// accumulated answer.
#[derive(Debug)]
pub struct StreamSession {
	state: TurnState,
	conversation_id: ConversationId,
	user: Message,
	placeholder: Message,
	answer: String,
}

impl StreamSession {
	/// Start a turn. Returns `None` when there is nothing to send or no
	/// conversation to send it to.
	pub fn submit(
		input: &str,
		conversation: Option<ConversationId>,
		ids: &mut MessageIds,
	) -> Option<Self> {
		let question = input.trim();
		let conversation_id = conversation?;
		if question.is_empty() {
			return None;
		}
		let user = Message::user(ids.next(), question);
		let placeholder = Message::placeholder(ids.next());
		Some(Self {
			state: TurnState::Sending,
			conversation_id,
			user,
			placeholder,
			answer: String::new(),
		})
	}

	/// Current state.
	pub fn state(&self) -> TurnState {
		self.state
	}

	/// Answer accumulated so far.
	pub fn answer(&self) -> &str {
		&self.answer
	}

	/// Id of the message the answer is written into.
	pub fn placeholder_id(&self) -> MessageId {
		self.placeholder.id
	}

	/// Body that opens the answer stream.
	pub fn request(&self) -> StreamRequest {
		StreamRequest {
			message: self.user.content.clone(),
			conversation_id: self.conversation_id,
		}
	}

	/// Run the turn to completion: await `open`, then decode the chunks it
	/// yields until the completion event, a transport failure or the end of
	/// the stream.
	pub async fn run<F, S, B, K>(mut self, open: F, sink: &mut K) -> TurnState
	where
		F: Future<Output = Result<S>>,
		S: Stream<Item = Result<B>>,
		B: AsRef<[u8]>,
		K: TurnSink,
	{
		sink.state_changed(self.state);
		let chunks = match open.await {
			Ok(chunks) => chunks,
			Err(e) => {
				sink.begin_turn(self.user.clone(), self.placeholder.clone());
				self.fail(&e, sink);
				return self.state;
			}
		};
		self.stream_opened(sink);

		let mut chunks = std::pin::pin!(chunks);
		let mut decoder = FrameDecoder::new();
		while let Some(chunk) = chunks.next().await {
			let bytes = match chunk {
				Ok(bytes) => bytes,
				Err(e) => {
					self.fail(&e, sink);
					return self.state;
				}
			};
			for frame in decoder.push(bytes.as_ref()) {
				if let Some(event) = parse_frame(&frame) {
					self.handle_event(event, sink);
				}
				if self.state.is_terminal() {
					return self.state;
				}
			}
		}

		let dropped = decoder.finish();
		if dropped > 0 {
			debug!("discarding {} bytes of unterminated frame", dropped);
		}
		self.fail(&Error::StreamClosed, sink);
		self.state
	}

	/// `Sending → Streaming`: both messages become visible before any byte
	/// of the answer is read.
	pub fn stream_opened<K: TurnSink>(&mut self, sink: &mut K) {
		if self.state != TurnState::Sending {
			return;
		}
		sink.begin_turn(self.user.clone(), self.placeholder.clone());
		self.transition(TurnState::Streaming, sink);
	}

	/// Apply one event. Events outside `Streaming` are ignored.
	pub fn handle_event<K: TurnSink>(&mut self, event: StreamEvent, sink: &mut K) {
		if self.state != TurnState::Streaming {
			return;
		}
		match event {
			StreamEvent::ContentDelta { text } => {
				self.answer.push_str(&text);
				self.publish(sink);
			}
			StreamEvent::ErrorNotice { text } => {
				self.answer.push('\n');
				self.answer.push_str(&text);
				self.publish(sink);
			}
			StreamEvent::Completed => {
				info!(
					"answer {} complete ({} chars)",
					self.placeholder.id,
					self.answer.chars().count()
				);
				self.transition(TurnState::Completed, sink);
				sink.request_graph(GraphRequest {
					query: self.user.content.clone(),
					conversation_id: self.conversation_id,
					message_id: self.placeholder.id,
				});
			}
		}
	}

	/// End the turn as failed. Partial answers are kept. An empty one is
	/// replaced by [`FAILED_ANSWER_TEXT`] only when the transport failed; a
	/// stream that merely stopped early leaves it empty.
	pub fn fail<K: TurnSink>(&mut self, cause: &Error, sink: &mut K) {
		if self.state.is_terminal() {
			return;
		}
		if cause.is_transport() {
			error!("turn {} failed: {}", self.placeholder.id, cause);
			if self.answer.is_empty() {
				self.answer.push_str(FAILED_ANSWER_TEXT);
				self.publish(sink);
			}
		} else {
			warn!("turn {} ended early: {}", self.placeholder.id, cause);
		}
		self.transition(TurnState::Failed, sink);
	}

	fn publish<K: TurnSink>(&self, sink: &mut K) {
		sink.publish(AnswerSnapshot {
			message_id: self.placeholder.id,
			content: self.answer.clone(),
		});
	}

	fn transition<K: TurnSink>(&mut self, next: TurnState, sink: &mut K) {
		debug!("turn {}: {:?} -> {:?}", self.placeholder.id, self.state, next);
		self.state = next;
		sink.state_changed(next);
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use futures::future;
	use futures::stream;

	use super::*;
	use crate::chat::Transcript;

	#[derive(Default)]
	struct Recorder {
		transcript: Transcript,
		snapshots: Vec<AnswerSnapshot>,
		graph_requests: Vec<GraphRequest>,
		states: Vec<TurnState>,
	}

	impl TurnSink for Recorder {
		fn begin_turn(&mut self, user: Message, placeholder: Message) {
			self.transcript.begin_turn(user, placeholder);
		}

		fn publish(&mut self, snapshot: AnswerSnapshot) {
			self.transcript.apply(&snapshot);
			self.snapshots.push(snapshot);
		}

		fn request_graph(&mut self, request: GraphRequest) {
			self.graph_requests.push(request);
		}

		fn state_changed(&mut self, state: TurnState) {
			self.states.push(state);
		}
	}

	fn session(text: &str) -> StreamSession {
		StreamSession::submit(text, Some(ConversationId(4)), &mut MessageIds::new()).unwrap()
	}

	type Body = stream::Iter<std::vec::IntoIter<Result<Vec<u8>>>>;

	fn chunks(parts: &[&str]) -> Body {
		let owned: Vec<Result<Vec<u8>>> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
		stream::iter(owned)
	}

	#[test]
	fn submit_is_guarded() {
		let mut ids = MessageIds::new();
		assert!(StreamSession::submit("   ", Some(ConversationId(1)), &mut ids).is_none());
		assert!(StreamSession::submit("hello", None, &mut ids).is_none());

		let turn = StreamSession::submit("  hello ", Some(ConversationId(1)), &mut ids).unwrap();
		assert_eq!(turn.state(), TurnState::Sending);
		assert_eq!(
			turn.request(),
			StreamRequest {
				message: "hello".into(),
				conversation_id: ConversationId(1),
			}
		);
	}

	#[test]
	fn accepts_submit_only_when_not_in_flight() {
		assert!(TurnState::Idle.accepts_submit());
		assert!(TurnState::Completed.accepts_submit());
		assert!(TurnState::Failed.accepts_submit());
		assert!(!TurnState::Sending.accepts_submit());
		assert!(!TurnState::Streaming.accepts_submit());
	}

	#[test]
	fn deltas_accumulate_in_order() {
		let turn = session("q");
		let placeholder = turn.placeholder_id();
		let mut sink = Recorder::default();
		let body = chunks(&[
			"data: {\"content\":\"He\"}\n\ndata: {\"con",
			"tent\":\"llo\"}\n",
			"\ndata: {\"finished\":true}\n\n",
		]);

		let state = block_on(turn.run(future::ready(Ok(body)), &mut sink));

		assert_eq!(state, TurnState::Completed);
		assert_eq!(sink.transcript.get(placeholder).unwrap().content, "Hello");
		let contents: Vec<_> = sink.snapshots.iter().map(|s| s.content.as_str()).collect();
		assert_eq!(contents, vec!["He", "Hello"]);
		assert_eq!(
			sink.states,
			vec![TurnState::Sending, TurnState::Streaming, TurnState::Completed]
		);
		assert_eq!(
			sink.graph_requests,
			vec![GraphRequest {
				query: "q".into(),
				conversation_id: ConversationId(4),
				message_id: placeholder,
			}]
		);
	}

	#[test]
	fn error_notices_are_appended_inline() {
		let turn = session("q");
		let placeholder = turn.placeholder_id();
		let mut sink = Recorder::default();
		let body = chunks(&[
			"data: {\"content\":\"partial\"}\n\n",
			"data: {\"error\":\"knowledge lookup failed\"}\n\n",
			"data: {\"finished\":true}\n\n",
		]);

		block_on(turn.run(future::ready(Ok(body)), &mut sink));

		assert_eq!(
			sink.transcript.get(placeholder).unwrap().content,
			"partial\nknowledge lookup failed"
		);
	}

	#[test]
	fn frames_after_completion_are_not_read() {
		let turn = session("q");
		let mut sink = Recorder::default();
		let body = chunks(&[
			"data: {\"finished\":true}\n\ndata: {\"content\":\"late\"}\n\n",
			"data: {\"finished\":true}\n\n",
		]);

		let state = block_on(turn.run(future::ready(Ok(body)), &mut sink));

		assert_eq!(state, TurnState::Completed);
		assert!(sink.snapshots.is_empty());
		assert_eq!(sink.graph_requests.len(), 1);
	}

	#[test]
	fn open_failure_shows_fallback_text() {
		let turn = session("q");
		let placeholder = turn.placeholder_id();
		let mut sink = Recorder::default();
		let open = future::ready(Err::<Body, _>(Error::Api {
			status: 500,
			message: "boom".into(),
		}));

		let state = block_on(turn.run(open, &mut sink));

		assert_eq!(state, TurnState::Failed);
		assert_eq!(
			sink.transcript.get(placeholder).unwrap().content,
			FAILED_ANSWER_TEXT
		);
		assert_eq!(sink.transcript.messages().len(), 2);
		assert!(sink.graph_requests.is_empty());
	}

	#[test]
	fn read_failure_keeps_partial_answer() {
		let turn = session("q");
		let placeholder = turn.placeholder_id();
		let mut sink = Recorder::default();
		let body = stream::iter(vec![
			Ok(b"data: {\"content\":\"Gin\"}\n\n".to_vec()),
			Err(Error::StreamClosed),
			Ok(b"data: {\"content\":\"seng\"}\n\n".to_vec()),
		]);

		let state = block_on(turn.run(future::ready(Ok(body)), &mut sink));

		assert_eq!(state, TurnState::Failed);
		assert_eq!(sink.transcript.get(placeholder).unwrap().content, "Gin");
		assert!(sink.graph_requests.is_empty());
	}

	#[test]
	fn end_of_stream_without_completion_fails() {
		let turn = session("q");
		let placeholder = turn.placeholder_id();
		let mut sink = Recorder::default();
		let body = chunks(&["data: {\"content\":\"A\"}\n\ndata: {\"finished\":true}"]);

		let state = block_on(turn.run(future::ready(Ok(body)), &mut sink));

		assert_eq!(state, TurnState::Failed);
		assert_eq!(sink.transcript.get(placeholder).unwrap().content, "A");
	}

	#[test]
	fn silent_end_of_stream_leaves_answer_empty() {
		let turn = session("q");
		let placeholder = turn.placeholder_id();
		let mut sink = Recorder::default();

		let state = block_on(turn.run(future::ready(Ok(chunks(&[": ping\n\n"]))), &mut sink));

		assert_eq!(state, TurnState::Failed);
		assert_eq!(sink.transcript.get(placeholder).unwrap().content, "");
		assert!(sink.snapshots.is_empty());
		assert!(sink.graph_requests.is_empty());
	}

	#[test]
	fn events_before_open_are_ignored() {
		let mut turn = session("q");
		let mut sink = Recorder::default();
		turn.handle_event(StreamEvent::ContentDelta { text: "x".into() }, &mut sink);
		assert!(sink.snapshots.is_empty());
		assert_eq!(turn.answer(), "");
	}
}
