use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Storage key the login page writes the signed-in user to.
pub const USER_STORAGE_KEY: &str = "user";

/// The signed-in user, passed explicitly to every backend call that needs
/// one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
	/// Backend user id.
	pub id: i64,
	/// Display name, when the login page stored one.
	#[serde(default)]
	pub username: Option<String>,
}

impl UserSession {
	/// Parse the value the login page stored.
	pub fn from_json(raw: &str) -> Result<Self> {
		Ok(serde_json::from_str(raw)?)
	}

	/// Read the user from browser local storage. `None` when nobody is
	/// signed in or the stored value is unreadable.
	pub fn load() -> Option<Self> {
		let raw = web_sys::window()?
			.local_storage()
			.ok()??
			.get_item(USER_STORAGE_KEY)
			.ok()??;
		match Self::from_json(&raw) {
			Ok(user) => Some(user),
			Err(e) => {
				warn!("ignoring stored user: {e}");
				None
			}
		}
	}
}
