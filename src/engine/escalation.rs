// src/engine/escalation.rs

use std::sync::Arc;

use log::{debug, info};

use crate::db::connection::SqlitePool;
use crate::error::CorrelationError;
use crate::models::workflow::{EscalationRequest, WorkflowStatus};
use crate::repositories::asset_repo::AssetRepository;
use crate::repositories::workflow_repo::WorkflowRepository;

/// Walks every known asset's workflow and collects the elements that have
/// not yet been escalated.
///
/// Read-only: status transitions belong to the store, after the event sink
/// accepts a request. Scanning twice with no downstream change therefore
/// yields the identical request set.
pub struct EscalationScanner {
	assets: AssetRepository,
	workflow: WorkflowRepository,
}

impl EscalationScanner {
	pub fn new(pool: Arc<SqlitePool>) -> Self {
		Self {
			assets: AssetRepository::new(pool.clone()),
			workflow: WorkflowRepository::new(pool),
		}
	}

	pub async fn scan(&self) -> Result<Vec<EscalationRequest>, CorrelationError> {
		let assets = self
			.assets
			.list_assets()
			.await
			.map_err(CorrelationError::store)?;
		debug!("processing {} assets", assets.len());

		let mut requests = Vec::new();
		for asset in &assets {
			let elements = self
				.workflow
				.get_workflow(asset)
				.await
				.map_err(CorrelationError::store)?;

			for element in elements {
				if element.status == WorkflowStatus::Escalated {
					continue;
				}
				requests.push(EscalationRequest::from_element(&element));
			}
		}

		info!("{} workflow elements pending escalation", requests.len());
		Ok(requests)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::db::{connection, schema};
	use crate::models::vulnerability::Vulnerability;
	use crate::repositories::vulnerability_repo::VulnerabilityRepository;
	use anyhow::Result;
	use tempfile::{tempdir, TempDir};

	async fn setup_test_db() -> Result<(TempDir, Arc<SqlitePool>)> {
		let dir = tempdir()?;
		let db_path = dir.path().join("test.db");
		let pool = Arc::new(connection::establish_pool_with_path(db_path)?);

		let conn = pool.get()?;
		schema::create_tables(&conn)?;

		Ok((dir, pool))
	}

	fn finding(vid: &str, cvss: f64) -> Vulnerability {
		Vulnerability {
			sitename: "lab".to_string(),
			asset_id: 7,
			ipaddr: "10.0.0.5".to_string(),
			hostname: None,
			macaddr: None,
			title: format!("finding {}", vid),
			discovered_date: None,
			discovered_date_unix: None,
			cves: vec![],
			cvss,
			rhsa: None,
			vid: vid.to_string(),
			known_exploits: false,
			known_malware: false,
		}
	}

	async fn seed_asset_with_findings(pool: &Arc<SqlitePool>) -> Result<i64> {
		let assets = AssetRepository::new(pool.clone());
		let vulns = VulnerabilityRepository::new(pool.clone());

		let db_asset_id = assets
			.ensure_asset("0|7|10.0.0.5|NA|NA", 7, "10.0.0.5", "", "")
			.await?;
		vulns.add_vulnerability(finding("vid-1", 7.5), db_asset_id, "corp").await?;
		vulns.add_vulnerability(finding("vid-2", 9.8), db_asset_id, "corp").await?;
		Ok(db_asset_id)
	}

	#[tokio::test]
	async fn test_scan_emits_unhandled_elements() -> Result<()> {
		let (_dir, pool) = setup_test_db().await?;
		seed_asset_with_findings(&pool).await?;

		let scanner = EscalationScanner::new(pool);
		let requests = scanner.scan().await?;

		assert_eq!(requests.len(), 2);
		assert!(requests.iter().all(|r| r.status == WorkflowStatus::NotHandled));
		assert_eq!(requests[0].contact, "corp");
		Ok(())
	}

	#[tokio::test]
	async fn test_scan_is_idempotent_without_state_change() -> Result<()> {
		let (_dir, pool) = setup_test_db().await?;
		seed_asset_with_findings(&pool).await?;

		let scanner = EscalationScanner::new(pool);
		let first: Vec<i64> = scanner.scan().await?.iter().map(|r| r.workflow_id).collect();
		let second: Vec<i64> = scanner.scan().await?.iter().map(|r| r.workflow_id).collect();

		assert_eq!(first, second);
		Ok(())
	}

	#[tokio::test]
	async fn test_escalated_elements_are_never_reemitted() -> Result<()> {
		let (_dir, pool) = setup_test_db().await?;
		seed_asset_with_findings(&pool).await?;

		let scanner = EscalationScanner::new(pool.clone());
		let workflow = WorkflowRepository::new(pool);

		let requests = scanner.scan().await?;
		assert_eq!(requests.len(), 2);

		workflow.mark_escalated(requests[0].workflow_id).await?;

		let remaining = scanner.scan().await?;
		assert_eq!(remaining.len(), 1);
		assert_ne!(remaining[0].workflow_id, requests[0].workflow_id);
		Ok(())
	}
}
