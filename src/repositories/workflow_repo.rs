// src/repositories/workflow_repo.rs

use crate::db::connection::SqlitePool;
use crate::models::asset::Asset;
use crate::models::vulnerability::Vulnerability;
use crate::models::workflow::{WorkflowElement, WorkflowStatus};
use chrono::NaiveDateTime;
use rusqlite::params;
use std::sync::Arc;
use anyhow::{Result, Context};
use tokio::task;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct WorkflowRepository {
	pool: Arc<SqlitePool>,
}

impl WorkflowRepository {
	pub fn new(pool: Arc<SqlitePool>) -> Self {
		Self { pool }
	}

	/// Workflow elements for one asset, each rehydrated with its full
	/// vulnerability record.
	pub async fn get_workflow(&self, asset: &Asset) -> Result<Vec<WorkflowElement>> {
		let pool = self.pool.clone();
		let db_asset_id = asset
			.db_id
			.ok_or_else(|| anyhow::anyhow!("asset has no database id"))?;

		task::spawn_blocking(move || {
			let conn = pool.get().context("Failed to get database connection")?;
			let mut stmt = conn.prepare(
				"SELECT
					w.workflow_id,
					w.status,
					w.last_handled,
					w.contact,
					v.vid,
					v.title,
					v.cvss,
					v.cves,
					v.rhsa,
					v.sitename,
					v.discovered_date,
					v.discovered_date_unix,
					v.known_exploits,
					v.known_malware,
					a.scanner_id,
					a.ipaddr,
					a.hostname,
					a.macaddr
				 FROM workflow w
				 JOIN vulnerabilities v ON w.vulnerability_id = v.vulnerability_id
				 JOIN assets a ON v.asset_id = a.asset_id
				 WHERE v.asset_id = ?1
				 ORDER BY w.workflow_id",
			)?;

			let element_iter = stmt.query_map([db_asset_id], |row| {
				let status_code: i64 = row.get(1)?;
				let last_handled: Option<String> = row.get(2)?;
				let cves: Option<String> = row.get(7)?;
				let discovered_date: Option<String> = row.get(10)?;

				Ok(WorkflowElement {
					workflow_id: row.get(0)?,
					status: WorkflowStatus::from_code(status_code),
					last_handled: last_handled
						.and_then(|d| NaiveDateTime::parse_from_str(&d, DATE_FORMAT).ok()),
					contact: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
					vulnerability: Vulnerability {
						sitename: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
						asset_id: row.get(14)?,
						ipaddr: row.get(15)?,
						hostname: row.get(16)?,
						macaddr: row.get(17)?,
						title: row.get(5)?,
						discovered_date: discovered_date
							.and_then(|d| NaiveDateTime::parse_from_str(&d, DATE_FORMAT).ok()),
						discovered_date_unix: row.get(11)?,
						cves: cves
							.map(|c| c.split(';').filter(|s| !s.is_empty()).map(String::from).collect())
							.unwrap_or_default(),
						cvss: row.get(6)?,
						rhsa: row.get(8)?,
						vid: row.get(4)?,
						known_exploits: row.get(12)?,
						known_malware: row.get(13)?,
					},
				})
			})?;

			element_iter
				.collect::<rusqlite::Result<Vec<_>>>()
				.context("Failed to collect workflow elements")
		})
			.await
			.context("Failed to execute database operation")?
	}

	/// Records that the downstream sink accepted an escalation event for
	/// this element. This is the only place the status transition happens.
	pub async fn mark_escalated(&self, workflow_id: i64) -> Result<()> {
		let pool = self.pool.clone();
		task::spawn_blocking(move || {
			let conn = pool.get().context("Failed to get database connection")?;
			let updated = conn.execute(
				"UPDATE workflow
				 SET status = ?1, last_handled = datetime('now')
				 WHERE workflow_id = ?2",
				params![WorkflowStatus::Escalated.code(), workflow_id],
			)?;

			if updated == 0 {
				anyhow::bail!("workflow element {} not found", workflow_id);
			}
			Ok(())
		})
			.await
			.context("Failed to execute database operation")?
	}
}
