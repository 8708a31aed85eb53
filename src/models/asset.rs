// src/models/asset.rs

use log::debug;
use serde::{Deserialize, Serialize};

/// Version tag prefixed to every identity string. Bump if the composition
/// scheme ever changes, so old and new identities cannot collide.
const IDENTITY_SCHEMA: &str = "0";

/// Placeholder for fields the scanner could not determine.
const NOT_AVAILABLE: &str = "NA";

/// A host known to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
	pub db_id: Option<i64>,
	pub identity: String,
	pub scanner_id: i64,
	pub ipaddr: String,
	pub hostname: Option<String>,
	pub macaddr: Option<String>,
}

/// Derives the stable identity string for an asset.
///
/// The identity is the deduplication key across scans: two observations
/// with the same scanner asset id, address, hostname and MAC always yield
/// the same string. Empty hostname/MAC collapse to the `NA` sentinel so
/// partially-populated records still produce a deterministic key. Pure
/// string composition; the address is not parsed or validated here.
pub fn asset_identity(address: &str, mac: &str, hostname: &str, scanner_id: i64) -> String {
	let mac = if mac.is_empty() { NOT_AVAILABLE } else { mac };
	let hostname = if hostname.is_empty() { NOT_AVAILABLE } else { hostname };

	let identity = format!(
		"{}|{}|{}|{}|{}",
		IDENTITY_SCHEMA, scanner_id, address, hostname, mac
	);
	debug!("using identifier {}", identity);
	identity
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_identity_sentinel_for_missing_fields() {
		assert_eq!(asset_identity("10.0.0.5", "", "", 7), "0|7|10.0.0.5|NA|NA");
	}

	#[test]
	fn test_identity_full_fields() {
		assert_eq!(
			asset_identity("10.0.0.5", "00:11:22:33:44:55", "web1.example.com", 42),
			"0|42|10.0.0.5|web1.example.com|00:11:22:33:44:55"
		);
	}

	#[test]
	fn test_identity_is_deterministic() {
		let a = asset_identity("192.168.1.9", "aa:bb:cc:dd:ee:ff", "db1", 3);
		let b = asset_identity("192.168.1.9", "aa:bb:cc:dd:ee:ff", "db1", 3);
		assert_eq!(a, b);
	}
}
