// src/error.rs

use thiserror::Error;

/// Failures the correlation engine can surface to its caller.
///
/// A missing rule match is not represented here; it is a normal outcome
/// reported through `AssetOutcome::Unmatched`.
#[derive(Debug, Error)]
pub enum CorrelationError {
	/// The input could not be parsed as an IPv4 address. Fatal to the
	/// single address being processed, not to the scan run.
	#[error("invalid IPv4 address '{0}'")]
	InvalidAddress(String),

	/// A rule definition was malformed. Fatal at load time, before any
	/// asset is processed.
	#[error("rule configuration error: {0}")]
	Config(String),

	/// A store operation failed. Aborts the current asset and is reported
	/// in the end-of-run aggregate; the run continues with the next asset.
	#[error("store operation failed: {0}")]
	Store(String),
}

impl CorrelationError {
	/// Flattens a repository failure chain into the `Store` kind.
	pub fn store(err: anyhow::Error) -> Self {
		CorrelationError::Store(format!("{:#}", err))
	}
}
