//! Client error type shared by the stream pipeline, the API client and the
//! graph loader.

use thiserror::Error;

/// Everything that can go wrong between the browser and the answering backend.
#[derive(Debug, Error)]
pub enum Error {
	/// The request never produced a response, or reading its body failed.
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),
	/// The backend answered with a non-success status.
	#[error("API error: {status} - {message}")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Message taken from the response body.
		message: String,
	},
	/// A payload did not have the expected JSON shape.
	#[error("Parse error: {0}")]
	Parse(#[from] serde_json::Error),
	/// The answer stream ended before the completion event arrived.
	#[error("stream closed before the answer was finished")]
	StreamClosed,
	/// The backend returned no usable nodes for a graph.
	#[error("no graph data available")]
	EmptyGraph,
	/// The embedded client configuration could not be read.
	#[error("Config error: {0}")]
	Config(String),
}

impl Error {
	/// The request failed or the backend refused it. A stream that simply
	/// ends early is not a transport failure.
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::Http(_) | Error::Api { .. })
	}
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
