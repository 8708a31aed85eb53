// src/utils/scan_importer.rs

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Result, Context};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use log::{info, warn};
use serde::Deserialize;

use crate::models::vulnerability::Vulnerability;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Represents one finding row in the scanner's CSV export.
///
/// The struct fields are mapped to the actual CSV column headers using
/// `serde`'s `rename` attribute.
#[derive(Debug, Deserialize)]
pub struct ScanCsvRecord {
	#[serde(rename = "AssetId")]
	pub asset_id: i64,

	#[serde(rename = "SiteName")]
	pub sitename: String,

	#[serde(rename = "IpAddress")]
	pub ipaddr: String,

	#[serde(rename = "Hostname")]
	pub hostname: Option<String>,

	#[serde(rename = "MacAddress")]
	pub macaddr: Option<String>,

	#[serde(rename = "Title")]
	pub title: String,

	#[serde(rename = "Cves")]
	pub cves: Option<String>,

	#[serde(rename = "Cvss")]
	pub cvss: f64,

	#[serde(rename = "Discovered")]
	pub discovered: Option<String>,

	#[serde(rename = "Vid")]
	pub vid: String,

	#[serde(rename = "Rhsa")]
	pub rhsa: Option<String>,

	#[serde(rename = "KnownExploits")]
	pub known_exploits: Option<i64>,

	#[serde(rename = "KnownMalware")]
	pub known_malware: Option<i64>,
}

/// One scanned host with all of its findings, ready for the correlation
/// pipeline. Empty hostname/MAC stay empty strings; the identity resolver
/// applies its own sentinel.
#[derive(Debug)]
pub struct ScannedAsset {
	pub scanner_id: i64,
	pub ipaddr: String,
	pub hostname: String,
	pub macaddr: String,
	pub vulnerabilities: Vec<Vulnerability>,
}

/// Reads a scan report CSV and groups its findings per asset.
///
/// Rows failing validation (unparseable, cvss outside 0-10) are skipped
/// with a warning and never abort the import. Assets keep their
/// first-seen order from the file.
pub fn read_scan_report(path: &Path) -> Result<Vec<ScannedAsset>> {
	let file = File::open(path)
		.with_context(|| format!("Failed to open scan report {:?}", path))?;

	let mut rdr = ReaderBuilder::new()
		.trim(csv::Trim::All)
		.from_reader(BufReader::new(file));

	let mut assets: Vec<ScannedAsset> = Vec::new();
	let mut index: std::collections::HashMap<(i64, String), usize> =
		std::collections::HashMap::new();
	let mut imported = 0;
	let mut skipped = 0;

	for (line_number, result) in rdr.deserialize::<ScanCsvRecord>().enumerate() {
		let record = match result {
			Ok(record) => record,
			Err(e) => {
				warn!("Skipping invalid record at line {}: {}", line_number + 2, e);
				skipped += 1;
				continue;
			}
		};

		if !(0.0..=10.0).contains(&record.cvss) {
			warn!(
				"Skipping record at line {}: cvss {} out of range",
				line_number + 2,
				record.cvss
			);
			skipped += 1;
			continue;
		}

		let key = (record.asset_id, record.ipaddr.clone());
		let slot = *index.entry(key).or_insert_with(|| {
			assets.push(ScannedAsset {
				scanner_id: record.asset_id,
				ipaddr: record.ipaddr.clone(),
				hostname: record.hostname.clone().unwrap_or_default(),
				macaddr: record.macaddr.clone().unwrap_or_default(),
				vulnerabilities: Vec::new(),
			});
			assets.len() - 1
		});

		assets[slot].vulnerabilities.push(to_vulnerability(record));
		imported += 1;
	}

	info!(
		"Import completed. {} findings across {} assets, {} rows skipped.",
		imported,
		assets.len(),
		skipped
	);
	Ok(assets)
}

/// Converts a validated CSV row into the pipeline's vulnerability record.
fn to_vulnerability(record: ScanCsvRecord) -> Vulnerability {
	let discovered_date = record
		.discovered
		.as_deref()
		.and_then(|d| NaiveDateTime::parse_from_str(d, DATE_FORMAT).ok());

	Vulnerability {
		sitename: record.sitename,
		asset_id: record.asset_id,
		ipaddr: record.ipaddr,
		hostname: record.hostname.filter(|h| !h.is_empty()),
		macaddr: record.macaddr.filter(|m| !m.is_empty()),
		title: record.title,
		discovered_date,
		discovered_date_unix: discovered_date.map(|d| d.and_utc().timestamp()),
		cves: parse_cve_list(record.cves.as_deref()),
		cvss: record.cvss,
		rhsa: record.rhsa.filter(|r| !r.is_empty()),
		vid: record.vid,
		known_exploits: record.known_exploits.unwrap_or(0) != 0,
		known_malware: record.known_malware.unwrap_or(0) != 0,
	}
}

/// Splits a `;`-separated CVE list, dropping entries that do not look like
/// CVE identifiers.
fn parse_cve_list(raw: Option<&str>) -> Vec<String> {
	let Some(raw) = raw else {
		return Vec::new();
	};

	raw.split(';')
		.map(str::trim)
		.filter(|token| !token.is_empty())
		.filter(|token| {
			let valid = is_valid_cve_id(token);
			if !valid {
				warn!("Dropping malformed CVE identifier '{}'", token);
			}
			valid
		})
		.map(String::from)
		.collect()
}

/// Validates the format of a CVE ID.
fn is_valid_cve_id(cve_id: &str) -> bool {
	let parts: Vec<&str> = cve_id.split('-').collect();
	parts.len() == 3
		&& parts[0].eq_ignore_ascii_case("CVE")
		&& parts[1].len() == 4 && parts[1].chars().all(|c| c.is_ascii_digit())
		&& parts[2].len() >= 4 && parts[2].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	const HEADER: &str = "AssetId,SiteName,IpAddress,Hostname,MacAddress,Title,Cves,Cvss,Discovered,Vid,Rhsa,KnownExploits,KnownMalware";

	fn write_report(rows: &[&str]) -> Result<(tempfile::TempDir, std::path::PathBuf)> {
		let dir = tempdir()?;
		let path = dir.path().join("scan.csv");
		let mut contents = String::from(HEADER);
		for row in rows {
			contents.push('\n');
			contents.push_str(row);
		}
		std::fs::write(&path, contents)?;
		Ok((dir, path))
	}

	#[test]
	fn test_rows_group_by_asset_in_first_seen_order() -> Result<()> {
		let (_dir, path) = write_report(&[
			"7,lab,10.0.0.5,web1,aa:bb:cc:dd:ee:ff,OpenSSL heartbeat,CVE-2014-0160,9.8,2026-07-01 10:00:00,vid-1,,1,0",
			"9,lab,10.0.0.9,db1,,Weak ciphers,,4.0,2026-07-01 10:05:00,vid-2,,0,0",
			"7,lab,10.0.0.5,web1,aa:bb:cc:dd:ee:ff,Stale kernel,CVE-2015-0001;CVE-2015-0002,6.5,,vid-3,RHSA-2015:001,0,0",
		])?;

		let assets = read_scan_report(&path)?;
		assert_eq!(assets.len(), 2);
		assert_eq!(assets[0].scanner_id, 7);
		assert_eq!(assets[0].vulnerabilities.len(), 2);
		assert_eq!(assets[0].hostname, "web1");
		assert_eq!(assets[1].scanner_id, 9);
		assert_eq!(assets[1].macaddr, "");

		let heartbleed = &assets[0].vulnerabilities[0];
		assert!(heartbleed.known_exploits);
		assert_eq!(heartbleed.cves, vec!["CVE-2014-0160"]);
		assert_eq!(
			heartbleed.discovered_date_unix,
			heartbleed.discovered_date.map(|d| d.and_utc().timestamp())
		);
		Ok(())
	}

	#[test]
	fn test_out_of_range_cvss_is_skipped() -> Result<()> {
		let (_dir, path) = write_report(&[
			"7,lab,10.0.0.5,,,Bogus,,11.0,,vid-1,,0,0",
			"7,lab,10.0.0.5,,,Real,,5.0,,vid-2,,0,0",
		])?;

		let assets = read_scan_report(&path)?;
		assert_eq!(assets.len(), 1);
		assert_eq!(assets[0].vulnerabilities.len(), 1);
		assert_eq!(assets[0].vulnerabilities[0].vid, "vid-2");
		Ok(())
	}

	#[test]
	fn test_malformed_cve_tokens_are_dropped() {
		assert!(is_valid_cve_id("CVE-2014-0160"));
		assert!(!is_valid_cve_id("CVE-14-0160"));
		assert!(!is_valid_cve_id("GHSA-xxxx-yyyy"));
		assert_eq!(
			parse_cve_list(Some("CVE-2014-0160;bogus;CVE-2020-11651")),
			vec!["CVE-2014-0160", "CVE-2020-11651"]
		);
	}
}
