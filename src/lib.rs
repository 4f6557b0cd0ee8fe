//! Leptos client-side chat app: streams answers from the backend and draws
//! the knowledge graph behind each one.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

mod api;
pub mod chat;
pub mod components;
mod config;
mod error;
mod pages;
pub mod stream;

pub use config::AppConfig;
pub use error::{Error, Result};

use crate::chat::{GraphStore, UserSession};
use crate::pages::chat::ChatPage;
use crate::pages::graph::GraphPage;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target. The level can be
/// lowered or raised later with [`log::set_max_level`].
pub fn init_logging(level: Level) {
	let _ = console_log::init_with_level(Level::Trace);
	log::set_max_level(level.to_level_filter());
	console_error_panic_hook::set_once();
	info!("Logging initialized at {level}");
}

/// An app router with the chat page, the graph page and a 404 fallback.
#[component]
pub fn App(
	/// Client settings, shared with every page through context.
	config: AppConfig,
) -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	let user = UserSession::load();
	match &user {
		Some(user) => info!("signed in as user {}", user.id),
		None => info!("no signed-in user"),
	}
	if let Some(user) = user {
		provide_context(user);
	}
	provide_context(config);
	provide_context(RwSignal::new(GraphStore::default()));

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		<Title text="Knowledge graph chat" />

		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=ChatPage />
				<Route path=path!("/graph/:conversation_id/:message_id") view=GraphPage />
			</Routes>
		</Router>
	}
}
