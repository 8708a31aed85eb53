// src/engine/pipeline.rs

use std::sync::Arc;

use log::{debug, info};

use crate::db::connection::SqlitePool;
use crate::engine::observation::ObservationCache;
use crate::engine::rules::RuleEngine;
use crate::error::CorrelationError;
use crate::models::asset::asset_identity;
use crate::models::vulnerability::Vulnerability;
use crate::repositories::asset_repo::AssetRepository;
use crate::repositories::vulnerability_repo::VulnerabilityRepository;

/// What happened to one asset in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOutcome {
	/// No rule covers the asset's address; nothing was written.
	Unmatched,
	/// The asset was correlated and its findings filtered against the
	/// matched rule's threshold.
	Processed { persisted: usize, filtered: usize },
}

/// End-of-run aggregate. Every asset and every finding ends up in exactly
/// one of these counters, so skipped work is always visible.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunReport {
	pub assets_processed: usize,
	pub assets_unmatched: usize,
	pub assets_failed: usize,
	pub vulns_persisted: usize,
	pub vulns_filtered: usize,
}

impl RunReport {
	pub fn record(&mut self, outcome: AssetOutcome) {
		match outcome {
			AssetOutcome::Unmatched => self.assets_unmatched += 1,
			AssetOutcome::Processed { persisted, filtered } => {
				self.assets_processed += 1;
				self.vulns_persisted += persisted;
				self.vulns_filtered += filtered;
			}
		}
	}

	pub fn record_failure(&mut self) {
		self.assets_failed += 1;
	}

	pub fn log_summary(&self) {
		info!(
			"scan run complete: {} assets correlated, {} unmatched, {} failed; \
			 {} vulnerabilities persisted, {} below threshold",
			self.assets_processed,
			self.assets_unmatched,
			self.assets_failed,
			self.vulns_persisted,
			self.vulns_filtered
		);
	}
}

/// Ties rule matching, identity derivation and persistence together for
/// one scan run. Owns the run's observation cache; the store is reached
/// only through the repositories passed in at construction.
pub struct CorrelationPipeline {
	engine: RuleEngine,
	cache: ObservationCache,
	assets: AssetRepository,
	vulnerabilities: VulnerabilityRepository,
}

impl CorrelationPipeline {
	pub fn new(engine: RuleEngine, pool: Arc<SqlitePool>) -> Self {
		Self {
			engine,
			cache: ObservationCache::new(),
			assets: AssetRepository::new(pool.clone()),
			vulnerabilities: VulnerabilityRepository::new(pool),
		}
	}

	/// Starts a new scan run; the observation cache must reflect exactly
	/// the assets of the run in progress.
	pub fn begin_run(&self) {
		self.cache.reset();
	}

	/// Correlates one asset and its findings.
	///
	/// An asset with no governing rule is skipped whole: no store write,
	/// no cache registration. A store failure aborts the remaining writes
	/// for this asset and is returned to the caller; previously persisted
	/// findings for the asset stand.
	pub async fn process(
		&self,
		vulnerabilities: &[Vulnerability],
		scanner_id: i64,
		address: &str,
		mac: &str,
		hostname: &str,
	) -> Result<AssetOutcome, CorrelationError> {
		debug!("correlation pipeline for scanner asset {}", scanner_id);

		let rule = match self.engine.select(address)? {
			Some(rule) => rule,
			None => {
				debug!("skipping asset {}: no governing rule", scanner_id);
				return Ok(AssetOutcome::Unmatched);
			}
		};

		let identity = asset_identity(address, mac, hostname, scanner_id);
		self.cache.register(&identity);

		let db_asset_id = self
			.assets
			.ensure_asset(&identity, scanner_id, address, mac, hostname)
			.await
			.map_err(CorrelationError::store)?;
		debug!("using db asset {}", db_asset_id);

		let mut persisted = 0;
		let mut filtered = 0;
		for vulnerability in vulnerabilities {
			// Inclusive boundary: a finding exactly at the rule minimum is kept.
			if vulnerability.cvss >= rule.min_cvss {
				debug!("processing vulnerability {}", vulnerability.vid);
				self.vulnerabilities
					.add_vulnerability(vulnerability.clone(), db_asset_id, &rule.name)
					.await
					.map_err(CorrelationError::store)?;
				persisted += 1;
			} else {
				debug!(
					"skipping vulnerability {}: cvss {} below rule minimum {}",
					vulnerability.vid, vulnerability.cvss, rule.min_cvss
				);
				filtered += 1;
			}
		}

		Ok(AssetOutcome::Processed { persisted, filtered })
	}

	/// Expires stored assets that were not observed in this run. Call only
	/// after the run completed fully; a cancelled or partial run must skip
	/// expiry so unvisited assets are not wrongly aged out.
	pub async fn finish_run(&self) -> Result<usize, CorrelationError> {
		self.assets
			.expire_hosts(self.cache.snapshot())
			.await
			.map_err(CorrelationError::store)
	}

	/// Number of distinct identities observed so far in this run.
	pub fn observed(&self) -> usize {
		self.cache.len()
	}
}
