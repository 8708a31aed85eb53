// src/repositories/vulnerability_repo.rs

use crate::db::connection::SqlitePool;
use crate::models::vulnerability::Vulnerability;
use crate::models::workflow::WorkflowStatus;
use rusqlite::params;
use std::sync::Arc;
use anyhow::{Result, Context};
use tokio::task;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct VulnerabilityRepository {
	pool: Arc<SqlitePool>,
}

impl VulnerabilityRepository {
	pub fn new(pool: Arc<SqlitePool>) -> Self {
		Self { pool }
	}

	/// Persists one vulnerability against an asset row, creating its
	/// initial workflow element in the same transaction so a finding can
	/// never exist without tracked handling state.
	pub async fn add_vulnerability(
		&self,
		vulnerability: Vulnerability,
		db_asset_id: i64,
		contact: &str,
	) -> Result<i64> {
		let pool = self.pool.clone();
		let contact = contact.to_string();

		task::spawn_blocking(move || {
			let mut conn = pool.get().context("Failed to get database connection")?;
			let tx = conn.transaction()?;

			tx.execute(
				"INSERT INTO vulnerabilities (
					asset_id, vid, title, cvss, cves, rhsa, sitename,
					discovered_date, discovered_date_unix, known_exploits, known_malware
				 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
				params![
					db_asset_id,
					vulnerability.vid,
					vulnerability.title,
					vulnerability.cvss,
					vulnerability.cves.join(";"),
					vulnerability.rhsa,
					vulnerability.sitename,
					vulnerability.discovered_date.map(|d| d.format(DATE_FORMAT).to_string()),
					vulnerability.discovered_date_unix,
					vulnerability.known_exploits,
					vulnerability.known_malware,
				],
			).context("Failed to insert vulnerability")?;

			let vulnerability_id = tx.last_insert_rowid();

			tx.execute(
				"INSERT INTO workflow (vulnerability_id, status, contact)
				 VALUES (?1, ?2, ?3)",
				params![vulnerability_id, WorkflowStatus::NotHandled.code(), contact],
			).context("Failed to insert workflow element")?;

			tx.commit().context("Failed to commit transaction")?;
			Ok(vulnerability_id)
		})
			.await
			.context("Failed to execute database operation")?
	}

	/// Vulnerability count for a single asset row.
	pub async fn count_for_asset(&self, db_asset_id: i64) -> Result<i64> {
		let pool = self.pool.clone();
		task::spawn_blocking(move || {
			let conn = pool.get().context("Failed to get database connection")?;
			conn.query_row(
				"SELECT COUNT(*) FROM vulnerabilities WHERE asset_id = ?1",
				params![db_asset_id],
				|row| row.get(0),
			)
				.context("Failed to count vulnerabilities")
		})
			.await
			.context("Failed to execute database operation")?
	}
}
