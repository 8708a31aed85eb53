// src/main.rs

mod db;
mod engine;
mod error;
mod models;
mod repositories;
mod utils;

use anyhow::{Context, Result};
use db::connection::{self, SqlitePool};
use db::schema;
use engine::escalation::EscalationScanner;
use engine::pipeline::{CorrelationPipeline, RunReport};
use log::{error, info, warn};
use repositories::workflow_repo::WorkflowRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use utils::event_dispatcher::EventDispatcher;
use utils::rule_loader;
use utils::scan_importer::{self, ScannedAsset};

const DEFAULT_RULE_DIR: &str = "rules";
const ESCALATION_ENDPOINT_VAR: &str = "VULNCORR_ESCALATION_URL";

struct App {
	pool: Arc<SqlitePool>,
	pipeline: CorrelationPipeline,
	scanner: EscalationScanner,
	dispatcher: EventDispatcher,
}

impl App {
	fn new(rule_dir: &Path) -> Result<Self> {
		utils::logger::init();
		info!("Starting vulnerability correlation engine");

		let pool = Arc::new(
			connection::establish_pool()
				.context("Failed to establish database connection pool")?,
		);

		let rules = rule_loader::load_rules(rule_dir)
			.context("Failed to load automation rules")?;
		if rules.is_empty() {
			warn!("no automation rules loaded; every asset will be unmatched");
		}

		let endpoint = std::env::var(ESCALATION_ENDPOINT_VAR).ok();
		if endpoint.is_none() {
			info!(
				"{} not set, escalation events will only be logged",
				ESCALATION_ENDPOINT_VAR
			);
		}

		let pipeline = CorrelationPipeline::new(rules, pool.clone());
		let scanner = EscalationScanner::new(pool.clone());
		let dispatcher =
			EventDispatcher::new(WorkflowRepository::new(pool.clone()), endpoint)?;

		Ok(App {
			pool,
			pipeline,
			scanner,
			dispatcher,
		})
	}

	fn init_database(&self) -> Result<()> {
		let conn = self.pool.get().context("Failed to get database connection")?;
		schema::create_tables(&conn).context("Failed to create database tables")?;
		info!("Database tables initialized successfully");
		Ok(())
	}

	/// Correlates every asset in the report, then expires the absentees.
	///
	/// Per-asset failures are isolated: they are logged, counted, and the
	/// run moves on to the next asset.
	async fn run_scan(&self, assets: &[ScannedAsset]) -> Result<RunReport> {
		self.pipeline.begin_run();
		let mut report = RunReport::default();

		for asset in assets {
			let result = self
				.pipeline
				.process(
					&asset.vulnerabilities,
					asset.scanner_id,
					&asset.ipaddr,
					&asset.macaddr,
					&asset.hostname,
				)
				.await;

			match result {
				Ok(outcome) => report.record(outcome),
				Err(e) => {
					error!("asset {} failed: {}", asset.scanner_id, e);
					report.record_failure();
				}
			}
		}

		let expired = self.pipeline.finish_run().await?;
		info!(
			"{} assets observed this run, {} expired",
			self.pipeline.observed(),
			expired
		);

		report.log_summary();
		Ok(report)
	}

	async fn escalate(&self) -> Result<()> {
		let requests = self.scanner.scan().await?;
		self.dispatcher.dispatch(&requests).await?;
		Ok(())
	}

	async fn run(&self, report_path: &Path) -> Result<()> {
		self.init_database()?;

		let scanned = scan_importer::read_scan_report(report_path)
			.context("Failed to read scan report")?;

		tokio::select! {
			result = self.run_scan(&scanned) => {
				result?;
			}
			_ = signal::ctrl_c() => {
				// A partial run must not age out assets it never visited.
				warn!("interrupted mid-run, skipping host expiry and escalation");
				return Ok(());
			}
		}

		self.escalate().await
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let mut args = std::env::args().skip(1);
	let report_path = PathBuf::from(args.next().context(
		"usage: vulnerability_correlator <scan-report.csv> [rule-dir]",
	)?);
	let rule_dir = args
		.next()
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from(DEFAULT_RULE_DIR));

	let app = App::new(&rule_dir)?;
	app.run(&report_path).await
}
