//! Conversation data held by the client: messages, the live transcript,
//! loaded graphs and the signed-in user.

mod graphs;
mod markdown;
mod message;
mod transcript;
mod user;

pub use graphs::GraphStore;
pub use markdown::render_markdown;
pub use message::{ConversationId, ConversationSummary, Message, MessageId, MessageIds, Role};
pub use transcript::{Transcript, question_for};
pub use user::{USER_STORAGE_KEY, UserSession};
