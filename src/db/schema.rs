use rusqlite::Connection;
use anyhow::{Result, Context};

pub fn create_tables(conn: &Connection) -> Result<()> {
	conn.execute_batch(
		"
		CREATE TABLE IF NOT EXISTS assets (
			asset_id INTEGER PRIMARY KEY AUTOINCREMENT,
			identity TEXT UNIQUE NOT NULL,
			scanner_id INTEGER NOT NULL,
			ipaddr TEXT NOT NULL,
			hostname TEXT,
			macaddr TEXT,
			first_seen TEXT NOT NULL DEFAULT (datetime('now')),
			last_seen TEXT NOT NULL DEFAULT (datetime('now')),
			expired_at TEXT
		);

		CREATE TABLE IF NOT EXISTS vulnerabilities (
			vulnerability_id INTEGER PRIMARY KEY AUTOINCREMENT,
			asset_id INTEGER NOT NULL REFERENCES assets(asset_id),
			vid TEXT NOT NULL,
			title TEXT NOT NULL,
			cvss REAL NOT NULL,
			cves TEXT,
			rhsa TEXT,
			sitename TEXT,
			discovered_date TEXT,
			discovered_date_unix INTEGER,
			known_exploits INTEGER NOT NULL DEFAULT 0,
			known_malware INTEGER NOT NULL DEFAULT 0
		);

		CREATE TABLE IF NOT EXISTS workflow (
			workflow_id INTEGER PRIMARY KEY AUTOINCREMENT,
			vulnerability_id INTEGER NOT NULL REFERENCES vulnerabilities(vulnerability_id),
			status INTEGER NOT NULL DEFAULT 0,
			last_handled TEXT,
			contact TEXT
		);

		CREATE INDEX IF NOT EXISTS idx_asset_identity
		ON assets(identity);

		CREATE INDEX IF NOT EXISTS idx_vulnerability_asset
		ON vulnerabilities(asset_id);

		CREATE INDEX IF NOT EXISTS idx_workflow_status
		ON workflow(status, vulnerability_id);
		"
	).context("Failed to create tables")?;

	Ok(())
}
