//! Client side of the answer stream: byte chunks become frames, frames become
//! events, and events drive one turn of the conversation.

mod decoder;
mod event;
mod session;

pub use decoder::{FRAME_SEPARATOR, FrameDecoder};
pub use event::{DATA_MARKER, StreamEvent, parse_frame};
pub use session::{
	AnswerSnapshot, FAILED_ANSWER_TEXT, GraphRequest, StreamRequest, StreamSession, TurnSink,
	TurnState,
};
