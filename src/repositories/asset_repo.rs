// src/repositories/asset_repo.rs

use crate::db::connection::SqlitePool;
use crate::models::asset::Asset;
use rusqlite::params;
use std::collections::HashSet;
use std::sync::Arc;
use anyhow::{Result, Context};
use log::info;
use tokio::task;

pub struct AssetRepository {
	pool: Arc<SqlitePool>,
}

impl AssetRepository {
	pub fn new(pool: Arc<SqlitePool>) -> Self {
		Self { pool }
	}

	/// Create-or-fetch an asset by identity, returning its row id.
	///
	/// An already-known identity only refreshes `last_seen` (and clears a
	/// previous expiry); the row id stays stable across scans.
	pub async fn ensure_asset(
		&self,
		identity: &str,
		scanner_id: i64,
		ipaddr: &str,
		macaddr: &str,
		hostname: &str,
	) -> Result<i64> {
		let pool = self.pool.clone();
		let identity = identity.to_string();
		let ipaddr = ipaddr.to_string();
		let macaddr = non_empty(macaddr);
		let hostname = non_empty(hostname);

		task::spawn_blocking(move || {
			let mut conn = pool.get().context("Failed to get database connection")?;
			let tx = conn.transaction()?;

			tx.execute(
				"INSERT OR IGNORE INTO assets (identity, scanner_id, ipaddr, hostname, macaddr)
				 VALUES (?1, ?2, ?3, ?4, ?5)",
				params![identity, scanner_id, ipaddr, hostname, macaddr],
			)?;

			tx.execute(
				"UPDATE assets SET last_seen = datetime('now'), expired_at = NULL
				 WHERE identity = ?1",
				params![identity],
			)?;

			let asset_id: i64 = tx.query_row(
				"SELECT asset_id FROM assets WHERE identity = ?1",
				params![identity],
				|row| row.get(0),
			)?;

			tx.commit()?;
			Ok(asset_id)
		})
			.await
			.context("Failed to execute database operation")?
	}

	/// All assets not currently marked expired.
	pub async fn list_assets(&self) -> Result<Vec<Asset>> {
		let pool = self.pool.clone();
		task::spawn_blocking(move || {
			let conn = pool.get().context("Failed to get database connection")?;
			let mut stmt = conn.prepare(
				"SELECT asset_id, identity, scanner_id, ipaddr, hostname, macaddr
				 FROM assets
				 WHERE expired_at IS NULL
				 ORDER BY asset_id",
			)?;

			let asset_iter = stmt.query_map([], |row| {
				Ok(Asset {
					db_id: Some(row.get(0)?),
					identity: row.get(1)?,
					scanner_id: row.get(2)?,
					ipaddr: row.get(3)?,
					hostname: row.get(4)?,
					macaddr: row.get(5)?,
				})
			})?;

			asset_iter
				.collect::<rusqlite::Result<Vec<_>>>()
				.context("Failed to collect assets")
		})
			.await
			.context("Failed to execute database operation")?
	}

	/// Marks every active asset whose identity is absent from `observed`
	/// as expired. Rows are never deleted. Returns the number expired.
	pub async fn expire_hosts(&self, observed: HashSet<String>) -> Result<usize> {
		let pool = self.pool.clone();
		task::spawn_blocking(move || {
			let mut conn = pool.get().context("Failed to get database connection")?;
			let tx = conn.transaction()?;

			let active: Vec<(i64, String)> = {
				let mut stmt = tx.prepare(
					"SELECT asset_id, identity FROM assets WHERE expired_at IS NULL",
				)?;
				let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
				rows.collect::<rusqlite::Result<Vec<_>>>()
					.context("Failed to collect active assets")?
			};

			let mut expired = 0;
			for (asset_id, identity) in active {
				if observed.contains(&identity) {
					continue;
				}
				tx.execute(
					"UPDATE assets SET expired_at = datetime('now') WHERE asset_id = ?1",
					params![asset_id],
				)?;
				expired += 1;
			}

			tx.commit()?;
			if expired > 0 {
				info!("expired {} assets absent from this scan", expired);
			}
			Ok(expired)
		})
			.await
			.context("Failed to execute database operation")?
	}
}

fn non_empty(s: &str) -> Option<String> {
	if s.is_empty() {
		None
	} else {
		Some(s.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::db::{connection, schema};
	use tempfile::{tempdir, TempDir};

	async fn setup_test_db() -> Result<(TempDir, Arc<SqlitePool>)> {
		let dir = tempdir()?;
		let db_path = dir.path().join("test.db");
		let pool = Arc::new(connection::establish_pool_with_path(db_path)?);

		let conn = pool.get()?;
		schema::create_tables(&conn)?;

		Ok((dir, pool))
	}

	#[tokio::test]
	async fn test_ensure_asset_is_idempotent() -> Result<()> {
		let (_dir, pool) = setup_test_db().await?;
		let repo = AssetRepository::new(pool);

		let first = repo
			.ensure_asset("0|7|10.0.0.5|NA|NA", 7, "10.0.0.5", "", "")
			.await?;
		let second = repo
			.ensure_asset("0|7|10.0.0.5|NA|NA", 7, "10.0.0.5", "", "")
			.await?;

		assert_eq!(first, second);
		assert_eq!(repo.list_assets().await?.len(), 1);
		Ok(())
	}

	#[tokio::test]
	async fn test_expire_hosts_marks_only_absent_assets() -> Result<()> {
		let (_dir, pool) = setup_test_db().await?;
		let repo = AssetRepository::new(pool);

		repo.ensure_asset("0|1|10.0.0.1|NA|NA", 1, "10.0.0.1", "", "").await?;
		repo.ensure_asset("0|2|10.0.0.2|NA|NA", 2, "10.0.0.2", "", "").await?;

		let mut observed = HashSet::new();
		observed.insert("0|1|10.0.0.1|NA|NA".to_string());

		let expired = repo.expire_hosts(observed).await?;
		assert_eq!(expired, 1);

		let remaining = repo.list_assets().await?;
		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].identity, "0|1|10.0.0.1|NA|NA");
		Ok(())
	}

	#[tokio::test]
	async fn test_reobserved_asset_is_unexpired() -> Result<()> {
		let (_dir, pool) = setup_test_db().await?;
		let repo = AssetRepository::new(pool);

		repo.ensure_asset("0|1|10.0.0.1|NA|NA", 1, "10.0.0.1", "", "").await?;
		repo.expire_hosts(HashSet::new()).await?;
		assert!(repo.list_assets().await?.is_empty());

		// Seen again in a later scan: the expiry marker is cleared.
		repo.ensure_asset("0|1|10.0.0.1|NA|NA", 1, "10.0.0.1", "", "").await?;
		assert_eq!(repo.list_assets().await?.len(), 1);
		Ok(())
	}
}
