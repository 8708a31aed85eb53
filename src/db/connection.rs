use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::PathBuf;
use anyhow::{Result, Context};
use log::info;

pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Establishes a connection pool with a custom database path
pub fn establish_pool_with_path(custom_path: PathBuf) -> Result<SqlitePool> {
	info!("SQLite database will be located at: {:?}", custom_path);

	if let Some(parent) = custom_path.parent() {
		std::fs::create_dir_all(parent)
			.context("Failed to create database directory")?;
	}

	// The workflow and vulnerability tables reference assets; enforce it.
	let manager = SqliteConnectionManager::file(custom_path)
		.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

	let pool = Pool::builder()
		.max_size(15)
		.build(manager)
		.context("Failed to create SQLite connection pool")?;

	info!("SQLite connection pool established successfully");
	Ok(pool)
}

/// Establishes a connection pool with a default database path
pub fn establish_pool() -> Result<SqlitePool> {
	let default_path = get_default_db_path();
	establish_pool_with_path(default_path)
}

/// Gets the default database path
fn get_default_db_path() -> PathBuf {
	// Create path relative to the current directory
	let mut db_path = PathBuf::from(".");
	db_path.push("database");
	db_path.push("correlation.db");
	db_path
}
