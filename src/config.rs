//! Client configuration embedded in the host page.

use std::str::FromStr;

use log::{Level, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlMetaElement;

use crate::api::DEFAULT_API_BASE;
use crate::components::force_graph::LayoutConfig;
use crate::error::{Error, Result};

/// `<meta name="relgraph-config" content="{...}">` holding [`AppConfig`] JSON.
pub const CONFIG_META_NAME: &str = "relgraph-config";

/// Assistant greeting stored in every new conversation.
pub const DEFAULT_WELCOME_MESSAGE: &str =
	"I am an assistant for classical Chinese medicine texts. How can I help you?";

/// Settings of the client, read once at startup.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Backend address, without a trailing slash.
	pub api_base_url: String,
	/// One of `error`, `warn`, `info`, `debug`, `trace`.
	pub log_level: String,
	/// Graph layout tuning.
	pub layout: LayoutConfig,
	/// First message of a new conversation; empty disables it.
	pub welcome_message: String,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base_url: DEFAULT_API_BASE.to_string(),
			log_level: "info".to_string(),
			layout: LayoutConfig::default(),
			welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
		}
	}
}

impl AppConfig {
	/// Parse configuration JSON. Blank input means defaults.
	pub fn from_json(raw: &str) -> Result<Self> {
		if raw.trim().is_empty() {
			return Ok(Self::default());
		}
		serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))
	}

	/// Read the configuration from the host page, falling back to defaults
	/// when it is absent or invalid.
	pub fn load() -> Self {
		let Some(raw) = read_meta(CONFIG_META_NAME) else {
			return Self::default();
		};
		Self::from_json(&raw).unwrap_or_else(|e| {
			warn!("using default configuration: {e}");
			Self::default()
		})
	}

	/// Configured log level; unknown names mean `info`.
	pub fn level(&self) -> Level {
		Level::from_str(&self.log_level).unwrap_or(Level::Info)
	}
}

fn read_meta(name: &str) -> Option<String> {
	let document = web_sys::window()?.document()?;
	let element = document
		.query_selector(&format!("meta[name=\"{name}\"]"))
		.ok()??;
	let meta: HtmlMetaElement = element.dyn_into().ok()?;
	Some(meta.content())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::LayoutKind;

	#[test]
	fn empty_config_means_defaults() {
		assert_eq!(AppConfig::from_json("").unwrap(), AppConfig::default());
		assert_eq!(AppConfig::from_json("{}").unwrap(), AppConfig::default());
	}

	#[test]
	fn partial_layout_keeps_other_defaults() {
		let config = AppConfig::from_json(
			r#"{
				"api_base_url": "https://tcm.example.org",
				"log_level": "debug",
				"layout": {"kind": "charge_spring", "warmup_ticks": 50}
			}"#,
		)
		.unwrap();
		assert_eq!(config.api_base_url, "https://tcm.example.org");
		assert_eq!(config.level(), Level::Debug);
		assert_eq!(config.layout.kind, LayoutKind::ChargeSpring);
		assert_eq!(config.layout.warmup_ticks, 50);
		assert_eq!(config.layout.link_distance, LayoutConfig::default().link_distance);
		assert_eq!(config.welcome_message, DEFAULT_WELCOME_MESSAGE);
	}

	#[test]
	fn invalid_json_is_a_config_error() {
		assert!(matches!(
			AppConfig::from_json("{not json"),
			Err(Error::Config(_))
		));
	}

	#[test]
	fn unknown_log_level_falls_back_to_info() {
		let config = AppConfig {
			log_level: "loud".into(),
			..AppConfig::default()
		};
		assert_eq!(config.level(), Level::Info);
	}
}
