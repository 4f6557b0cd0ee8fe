#![allow(unused_crate_dependencies)]

use leptos::prelude::*;
use log::Level;
use relgraph_chat::{App, AppConfig};

fn main() {
	relgraph_chat::init_logging(Level::Info);
	let config = AppConfig::load();
	log::set_max_level(config.level().to_level_filter());
	mount_to_body(move || view! { <App config=config /> })
}
