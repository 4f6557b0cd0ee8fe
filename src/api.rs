//! HTTP client for the answering backend.

use futures::{Stream, StreamExt};
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::chat::{ConversationId, ConversationSummary, Message, Role, UserSession};
use crate::components::force_graph::{GraphModel, GraphResponse};
use crate::error::{Error, Result};
use crate::stream::{GraphRequest, StreamRequest};

/// Where the backend listens when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

#[derive(Deserialize)]
struct CreatedConversation {
	conversation_id: ConversationId,
}

#[derive(Deserialize)]
struct ErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

/// Human-readable message from an error response body. The backend sends
/// either `{"error": ...}` or `{"status": "error", "message": ...}`.
pub fn api_error_message(body: &str) -> String {
	serde_json::from_str::<ErrorBody>(body)
		.ok()
		.and_then(|b| b.error.or(b.message))
		.unwrap_or_else(|| body.trim().to_string())
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}
	let body = response.text().await.unwrap_or_default();
	Err(Error::Api {
		status: status.as_u16(),
		message: api_error_message(&body),
	})
}

/// Backend client. Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
	http_client: reqwest::Client,
	base_url: String,
}

impl ApiClient {
	pub fn new(base_url: impl Into<String>) -> Self {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		Self {
			http_client: reqwest::Client::new(),
			base_url,
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Open the answer stream for a question. Resolves once response headers
	/// arrive; the body is yielded chunk by chunk as the backend writes it.
	pub async fn open_stream(
		&self,
		request: &StreamRequest,
	) -> Result<impl Stream<Item = Result<Vec<u8>>>> {
		debug!("opening answer stream for conversation {}", request.conversation_id);
		let response = self
			.http_client
			.post(self.url("/api/stream"))
			.json(request)
			.send()
			.await?;
		let response = check(response).await?;
		Ok(response
			.bytes_stream()
			.map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::from)))
	}

	/// Fetch and validate the knowledge graph of a finished answer.
	pub async fn fetch_graph(&self, request: &GraphRequest) -> Result<GraphModel> {
		let response = self
			.http_client
			.post(self.url("/api/knowledge-graph"))
			.json(request)
			.send()
			.await?;
		let raw: GraphResponse = check(response).await?.json().await?;
		GraphModel::from_response(raw)
	}

	/// Conversations of `user`, in the order the backend lists them.
	pub async fn conversations(&self, user: &UserSession) -> Result<Vec<ConversationSummary>> {
		let response = self
			.http_client
			.get(self.url("/api/conversations"))
			.query(&[("user_id", user.id)])
			.send()
			.await?;
		Ok(check(response).await?.json().await?)
	}

	/// Create an empty conversation and return its id.
	pub async fn create_conversation(&self, user: &UserSession) -> Result<ConversationId> {
		let response = self
			.http_client
			.post(self.url("/api/conversation"))
			.json(&json!({ "user_id": user.id }))
			.send()
			.await?;
		let created: CreatedConversation = check(response).await?.json().await?;
		Ok(created.conversation_id)
	}

	/// Stored history of a conversation.
	pub async fn messages(&self, conversation: ConversationId) -> Result<Vec<Message>> {
		let response = self
			.http_client
			.get(self.url(&format!("/api/conversation/{conversation}/messages")))
			.send()
			.await?;
		Ok(check(response).await?.json().await?)
	}

	/// Store a message in a conversation without asking for an answer.
	pub async fn post_message(
		&self,
		conversation: ConversationId,
		role: Role,
		content: &str,
	) -> Result<()> {
		let response = self
			.http_client
			.post(self.url(&format!("/api/conversation/{conversation}/message")))
			.json(&json!({ "content": content, "role": role }))
			.send()
			.await?;
		check(response).await?;
		Ok(())
	}

	pub async fn delete_conversation(&self, conversation: ConversationId) -> Result<()> {
		let response = self
			.http_client
			.delete(self.url(&format!("/api/conversation/{conversation}")))
			.send()
			.await?;
		check(response).await?;
		Ok(())
	}

	pub async fn rename_conversation(
		&self,
		user: &UserSession,
		conversation: ConversationId,
		name: &str,
	) -> Result<()> {
		let response = self
			.http_client
			.put(self.url(&format!("/api/conversation/{conversation}/rename")))
			.json(&json!({ "user_id": user.id, "name": name.trim() }))
			.send()
			.await?;
		check(response).await?;
		Ok(())
	}
}

impl Default for ApiClient {
	fn default() -> Self {
		Self::new(DEFAULT_API_BASE)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn base_url_loses_trailing_slash() {
		let api = ApiClient::new("http://example.test:8000/");
		assert_eq!(api.url("/api/stream"), "http://example.test:8000/api/stream");
	}

	#[test]
	fn error_message_prefers_error_then_message_then_body() {
		assert_eq!(api_error_message(r#"{"error": "not logged in"}"#), "not logged in");
		assert_eq!(
			api_error_message(r#"{"status": "error", "message": "No message provided"}"#),
			"No message provided"
		);
		assert_eq!(api_error_message(" Bad Gateway \n"), "Bad Gateway");
	}

	#[test]
	fn roles_serialize_as_backend_names() {
		let body = json!({ "content": "hi", "role": Role::Assistant });
		assert_eq!(body, json!({"content": "hi", "role": "assistant"}));
	}

	#[test]
	fn request_bodies_match_backend_fields() {
		let body = serde_json::to_value(GraphRequest {
			query: "ginseng?".into(),
			conversation_id: ConversationId(3),
			message_id: crate::chat::MessageId(42),
		})
		.unwrap();
		assert_eq!(
			body,
			json!({"query": "ginseng?", "conversation_id": 3, "message_id": 42})
		);
	}
}
