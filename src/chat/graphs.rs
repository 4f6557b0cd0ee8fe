use std::collections::HashMap;

use super::message::{ConversationId, MessageId};
use crate::components::force_graph::GraphModel;

/// Graphs loaded for answers, keyed by the conversation and the answer's
/// message id.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
	graphs: HashMap<(ConversationId, MessageId), GraphModel>,
}

impl GraphStore {
	/// Remember the graph of one answer, replacing an older one.
	pub fn insert(&mut self, conversation: ConversationId, message: MessageId, model: GraphModel) {
		self.graphs.insert((conversation, message), model);
	}

	/// Graph of one answer, if it was loaded.
	pub fn get(&self, conversation: ConversationId, message: MessageId) -> Option<&GraphModel> {
		self.graphs.get(&(conversation, message))
	}

	/// Whether the answer has a graph to link to.
	pub fn contains(&self, conversation: ConversationId, message: MessageId) -> bool {
		self.graphs.contains_key(&(conversation, message))
	}

	/// Drop every graph of a deleted conversation.
	pub fn forget_conversation(&mut self, conversation: ConversationId) {
		self.graphs.retain(|(c, _), _| *c != conversation);
	}

	/// Number of stored graphs.
	pub fn len(&self) -> usize {
		self.graphs.len()
	}

	/// Whether no graph was loaded yet.
	pub fn is_empty(&self) -> bool {
		self.graphs.is_empty()
	}
}
