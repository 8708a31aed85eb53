// src/models/vulnerability.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One finding reported by the scanner for a single asset.
///
/// Created by the scan report importer and treated as read-only from then
/// on; the pipeline inspects `cvss` and forwards the whole record to the
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
	pub sitename: String,
	pub asset_id: i64,
	pub ipaddr: String,
	pub hostname: Option<String>,
	pub macaddr: Option<String>,
	pub title: String,
	pub discovered_date: Option<NaiveDateTime>,
	pub discovered_date_unix: Option<i64>,
	pub cves: Vec<String>,
	pub cvss: f64,
	pub rhsa: Option<String>,
	pub vid: String,
	pub known_exploits: bool,
	pub known_malware: bool,
}
