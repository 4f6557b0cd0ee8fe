use leptos::html::Div;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::components::A;
use log::{info, warn};
use web_sys::KeyboardEvent;

use crate::api::ApiClient;
use crate::chat::{
	ConversationId, ConversationSummary, GraphStore, Message, MessageId, MessageIds, Role,
	Transcript, UserSession, render_markdown,
};
use crate::config::AppConfig;
use crate::error::Error;
use crate::stream::{AnswerSnapshot, GraphRequest, StreamSession, TurnSink, TurnState};

/// Connects a running turn to the page signals.
struct PageSink {
	api: ApiClient,
	conversation: ConversationId,
	transcript: RwSignal<Transcript>,
	graphs: RwSignal<GraphStore>,
	turn: RwSignal<TurnState>,
}

impl TurnSink for PageSink {
	fn begin_turn(&mut self, user: Message, placeholder: Message) {
		let conversation = self.conversation;
		self.transcript.update(|t| {
			if t.conversation() == Some(conversation) {
				t.begin_turn(user, placeholder);
			}
		});
	}

	fn publish(&mut self, snapshot: AnswerSnapshot) {
		self.transcript.update(|t| {
			t.apply(&snapshot);
		});
	}

	fn request_graph(&mut self, request: GraphRequest) {
		let (api, graphs) = (self.api.clone(), self.graphs);
		spawn_local(async move {
			match api.fetch_graph(&request).await {
				Ok(model) => {
					info!(
						"graph for answer {}: {} nodes, {} edges",
						request.message_id,
						model.len(),
						model.edges.len()
					);
					graphs.update(|g| g.insert(request.conversation_id, request.message_id, model));
				}
				Err(Error::EmptyGraph) => info!("no graph for answer {}", request.message_id),
				Err(e) => warn!("graph request for answer {} failed: {e}", request.message_id),
			}
		});
	}

	fn state_changed(&mut self, state: TurnState) {
		self.turn.set(state);
	}
}

/// Page-wide handles. Every field is a reactive handle, so the whole value
/// is `Copy` and can move into any view closure.
#[derive(Clone, Copy)]
struct ChatState {
	api: StoredValue<ApiClient, LocalStorage>,
	user: StoredValue<Option<UserSession>>,
	welcome: StoredValue<String>,
	ids: StoredValue<MessageIds>,
	conversations: RwSignal<Vec<ConversationSummary>>,
	transcript: RwSignal<Transcript>,
	graphs: RwSignal<GraphStore>,
	turn: RwSignal<TurnState>,
	streaming: RwSignal<Option<MessageId>>,
	input: RwSignal<String>,
	notice: RwSignal<Option<String>>,
}

impl ChatState {
	fn report(&self, what: &str, e: Error) {
		warn!("{what} failed: {e}");
		self.notice.set(Some(format!("{what} failed: {e}")));
	}

	fn refresh(self) {
		let Some(user) = self.user.get_value() else {
			return;
		};
		let api = self.api.get_value();
		spawn_local(async move {
			match api.conversations(&user).await {
				Ok(list) => {
					let first = list.first().map(|c| c.id);
					self.conversations.set(list);
					if self.transcript.with_untracked(|t| t.conversation().is_none()) {
						if let Some(id) = first {
							self.select(id);
						}
					}
				}
				Err(e) => self.report("Loading conversations", e),
			}
		});
	}

	fn select(self, id: ConversationId) {
		// Replacing the transcript first detaches any turn still streaming
		// into the previous conversation.
		self.transcript.set(Transcript::new(id, Vec::new()));
		let api = self.api.get_value();
		spawn_local(async move {
			match api.messages(id).await {
				Ok(history) => self.transcript.update(|t| {
					if t.conversation() == Some(id) {
						*t = Transcript::new(id, history);
					}
				}),
				Err(e) => self.report("Loading messages", e),
			}
		});
	}

	fn create(self) {
		let Some(user) = self.user.get_value() else {
			return;
		};
		let (api, welcome) = (self.api.get_value(), self.welcome.get_value());
		spawn_local(async move {
			match api.create_conversation(&user).await {
				Ok(id) => {
					info!("created conversation {id}");
					if !welcome.is_empty() {
						if let Err(e) = api.post_message(id, Role::Assistant, &welcome).await {
							warn!("welcome message for conversation {id} not stored: {e}");
						}
					}
					self.select(id);
					self.refresh();
				}
				Err(e) => self.report("Creating a conversation", e),
			}
		});
	}

	fn rename(self, summary: &ConversationSummary) {
		let Some(user) = self.user.get_value() else {
			return;
		};
		let name = window()
			.prompt_with_message_and_default("Rename conversation", &summary.title())
			.ok()
			.flatten()
			.map(|n| n.trim().to_string())
			.filter(|n| !n.is_empty());
		let Some(name) = name else {
			return;
		};
		let (api, id) = (self.api.get_value(), summary.id);
		spawn_local(async move {
			match api.rename_conversation(&user, id, &name).await {
				Ok(()) => self.refresh(),
				Err(e) => self.report("Renaming", e),
			}
		});
	}

	fn delete(self, id: ConversationId) {
		let api = self.api.get_value();
		spawn_local(async move {
			match api.delete_conversation(id).await {
				Ok(()) => {
					if self.transcript.with_untracked(|t| t.conversation() == Some(id)) {
						self.transcript.set(Transcript::default());
					}
					self.graphs.update(|g| g.forget_conversation(id));
					self.conversations.update(|list| list.retain(|c| c.id != id));
				}
				Err(e) => self.report("Deleting", e),
			}
		});
	}

	fn send(self) {
		if !self.turn.get_untracked().accepts_submit() {
			return;
		}
		let input = self.input.get_untracked();
		let conversation = self.transcript.with_untracked(|t| t.conversation());
		let session = self
			.ids
			.try_update_value(|ids| StreamSession::submit(&input, conversation, ids))
			.flatten();
		let (Some(session), Some(conversation)) = (session, conversation) else {
			return;
		};
		self.input.set(String::new());
		self.notice.set(None);
		self.streaming.set(Some(session.placeholder_id()));

		let api = self.api.get_value();
		spawn_local(async move {
			let request = session.request();
			let mut sink = PageSink {
				api: api.clone(),
				conversation,
				transcript: self.transcript,
				graphs: self.graphs,
				turn: self.turn,
			};
			let state = session.run(api.open_stream(&request), &mut sink).await;
			info!("turn in conversation {conversation} ended: {state:?}");
			self.streaming.set(None);
			self.refresh();
		});
	}
}

#[component]
fn Sidebar(state: ChatState) -> impl IntoView {
	let active = move || state.transcript.with(|t| t.conversation());
	view! {
		<aside class="sidebar">
			<div class="sidebar-header">
				<h2>"Conversations"</h2>
				<button on:click=move |_| state.create()>"New"</button>
			</div>
			<ul class="conversation-list">
				<For
					each=move || state.conversations.get()
					key=|c| (c.id, c.title())
					children=move |summary| {
						let id = summary.id;
						let title = summary.title();
						view! {
							<li
								class="conversation"
								class:active=move || active() == Some(id)
								on:click=move |_| state.select(id)
							>
								<span class="title">{title}</span>
								<button
									title="Rename"
									on:click=move |ev| {
										ev.stop_propagation();
										state.rename(&summary);
									}
								>
									"✎"
								</button>
								<button
									title="Delete"
									on:click=move |ev| {
										ev.stop_propagation();
										state.delete(id);
									}
								>
									"×"
								</button>
							</li>
						}
					}
				/>
			</ul>
		</aside>
	}
}

#[component]
fn MessageRow(message: Message, state: ChatState) -> impl IntoView {
	let id = message.id;
	let is_user = message.role == Role::User;
	let streaming = move || state.streaming.get() == Some(id);
	let graph_href = move || {
		let conversation = state.transcript.with(|t| t.conversation())?;
		state
			.graphs
			.with(|g| g.contains(conversation, id))
			.then(|| format!("/graph/{conversation}/{id}"))
	};
	let content = if is_user {
		view! { <p class="content">{message.content}</p> }.into_any()
	} else {
		let html = render_markdown(&message.content);
		view! { <div class="content markdown" inner_html=html></div> }.into_any()
	};
	view! {
		<div class="message" class:user=is_user class:assistant=!is_user>
			{content}
			<Show when=streaming>
				<span class="streaming-indicator">"…"</span>
			</Show>
			{move || graph_href().map(|href| view! { <A href=href>"View graph"</A> })}
		</div>
	}
}

/// Chat page: conversation sidebar, transcript and question input.
#[component]
pub fn ChatPage() -> impl IntoView {
	let config = use_context::<AppConfig>().unwrap_or_default();
	let user = use_context::<UserSession>();
	let graphs = use_context::<RwSignal<GraphStore>>().unwrap_or_else(|| RwSignal::new(GraphStore::default()));

	let state = ChatState {
		api: StoredValue::new_local(ApiClient::new(config.api_base_url)),
		user: StoredValue::new(user),
		welcome: StoredValue::new(config.welcome_message),
		ids: StoredValue::new(MessageIds::new()),
		conversations: RwSignal::new(Vec::new()),
		transcript: RwSignal::new(Transcript::default()),
		graphs,
		turn: RwSignal::new(TurnState::Idle),
		streaming: RwSignal::new(None),
		input: RwSignal::new(String::new()),
		notice: RwSignal::new(None),
	};
	state.refresh();

	let signed_in = state.user.with_value(Option::is_some);
	let busy = move || !state.turn.get().accepts_submit();
	let no_conversation = move || state.transcript.with(|t| t.conversation().is_none());

	// Keep the newest message in view as messages and answer text arrive.
	let transcript_ref = NodeRef::<Div>::new();
	Effect::new(move |_| {
		state.transcript.track();
		if let Some(el) = transcript_ref.get() {
			el.set_scroll_top(el.scroll_height());
		}
	});

	let on_keydown = move |ev: KeyboardEvent| {
		if ev.key() == "Enter" && !ev.shift_key() {
			ev.prevent_default();
			state.send();
		}
	};

	view! {
		<div class="chat-layout">
			<Show
				when=move || signed_in
				fallback=|| view! { <p class="notice">"Sign in to start a conversation."</p> }
			>
				<Sidebar state=state />
			</Show>
			<main class="chat">
				{move || state.notice.get().map(|n| view! { <p class="notice error">{n}</p> })}
				<div class="transcript" node_ref=transcript_ref>
					{move || {
						state
							.transcript
							.with(|t| t.messages().to_vec())
							.into_iter()
							.map(|message| view! { <MessageRow message=message state=state /> })
							.collect_view()
					}}
				</div>
				<div class="composer">
					<textarea
						placeholder="Ask a question"
						prop:value=move || state.input.get()
						on:input=move |ev| state.input.set(event_target_value(&ev))
						on:keydown=on_keydown
						disabled=move || no_conversation()
					/>
					<button
						on:click=move |_| state.send()
						disabled=move || busy() || no_conversation()
					>
						{move || if busy() { "Answering…" } else { "Send" }}
					</button>
				</div>
			</main>
		</div>
	}
}
