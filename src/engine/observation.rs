// src/engine/observation.rs

use std::collections::HashSet;
use std::sync::Mutex;

/// The set of asset identities observed during the current scan run.
///
/// Reset at run start, appended to by the pipeline, and read at run end to
/// decide which stored assets were absent and should be expired. Guarded
/// by a mutex so asset processing may be parallelised later without
/// changing callers.
#[derive(Default)]
pub struct ObservationCache {
	seen: Mutex<HashSet<String>>,
}

impl ObservationCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Clears the cache for a new scan run.
	pub fn reset(&self) {
		self.seen.lock().unwrap().clear();
	}

	/// Records an identity as observed. Returns false if it was already
	/// present.
	pub fn register(&self, identity: &str) -> bool {
		self.seen.lock().unwrap().insert(identity.to_string())
	}

	pub fn contains(&self, identity: &str) -> bool {
		self.seen.lock().unwrap().contains(identity)
	}

	pub fn len(&self) -> usize {
		self.seen.lock().unwrap().len()
	}

	/// A copy of the observed set, handed to the store for host expiry.
	pub fn snapshot(&self) -> HashSet<String> {
		self.seen.lock().unwrap().clone()
	}
}
