use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::components::A;
use leptos_router::hooks::use_params_map;
use log::{info, warn};

use crate::api::ApiClient;
use crate::chat::{ConversationId, GraphStore, MessageId, question_for};
use crate::components::force_graph::{ForceGraphCanvas, GraphModel};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::stream::GraphRequest;

#[derive(Clone, Debug)]
enum GraphLoad {
	Loading,
	Ready(GraphModel),
	Empty,
	Failed(String),
}

/// Load a graph that is not cached, e.g. after a page reload: the question is
/// recovered from the conversation history.
async fn refetch(
	api: &ApiClient,
	conversation: ConversationId,
	answer: MessageId,
) -> Result<GraphModel> {
	let history = api.messages(conversation).await?;
	let Some(query) = question_for(&history, answer) else {
		return Err(Error::EmptyGraph);
	};
	api.fetch_graph(&GraphRequest {
		query: query.to_string(),
		conversation_id: conversation,
		message_id: answer,
	})
	.await
}

fn parse_id(raw: Option<String>) -> Option<i64> {
	raw?.parse().ok()
}

/// Full-screen graph of one answer.
#[component]
pub fn GraphPage() -> impl IntoView {
	let config = use_context::<AppConfig>().unwrap_or_default();
	let graphs = use_context::<RwSignal<GraphStore>>().unwrap_or_else(|| RwSignal::new(GraphStore::default()));
	let api = StoredValue::new_local(ApiClient::new(config.api_base_url.clone()));
	let params = use_params_map();
	let status = RwSignal::new(GraphLoad::Loading);

	Effect::new(move |_| {
		let ids = params.with(|p| {
			Some((
				ConversationId(parse_id(p.get("conversation_id"))?),
				MessageId(parse_id(p.get("message_id"))?),
			))
		});
		let Some((conversation, answer)) = ids else {
			status.set(GraphLoad::Failed("Invalid conversation or message id".into()));
			return;
		};
		if let Some(model) = graphs.with_untracked(|g| g.get(conversation, answer).cloned()) {
			status.set(GraphLoad::Ready(model));
			return;
		}

		status.set(GraphLoad::Loading);
		let api = api.get_value();
		spawn_local(async move {
			match refetch(&api, conversation, answer).await {
				Ok(model) => {
					info!("graph for answer {answer} reloaded");
					graphs.update(|g| g.insert(conversation, answer, model.clone()));
					status.set(GraphLoad::Ready(model));
				}
				Err(Error::EmptyGraph) => status.set(GraphLoad::Empty),
				Err(e) => {
					warn!("graph for answer {answer} unavailable: {e}");
					status.set(GraphLoad::Failed(e.to_string()));
				}
			}
		});
	});

	let layout = config.layout;
	view! {
		<div class="graph-page">
			<nav class="graph-nav">
				<A href="/">"← Back to chat"</A>
			</nav>
			{move || match status.get() {
				GraphLoad::Loading => view! { <p class="notice">"Loading…"</p> }.into_any(),
				GraphLoad::Empty => {
					view! { <p class="notice">"No graph data was found for this answer."</p> }
						.into_any()
				}
				GraphLoad::Failed(message) => {
					view! { <p class="notice error">{message}</p> }.into_any()
				}
				GraphLoad::Ready(model) => {
					view! {
						<ForceGraphCanvas
							model=Signal::stored(model)
							layout=layout.clone()
							fullscreen=true
						/>
					}
						.into_any()
				}
			}}
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn route_ids_must_be_integers() {
		assert_eq!(parse_id(Some("42".into())), Some(42));
		assert_eq!(parse_id(Some("abc".into())), None);
		assert_eq!(parse_id(None), None);
	}
}
