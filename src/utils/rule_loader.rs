// src/utils/rule_loader.rs

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use crate::engine::rules::{MatchTarget, Rule, RuleEngine};
use crate::error::CorrelationError;

/// One rule definition as written in a rule file: a top-level JSON array
/// of these objects per file. `match` is a bare IPv4 address or a CIDR
/// expression.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDefinition {
	name: String,
	mincvss: f64,
	#[serde(rename = "match")]
	target: String,
}

/// Loads every `.json` rule file under `dir` into a `RuleEngine`.
///
/// Files are read in sorted name order and definitions keep their in-file
/// order, so precedence between equally specific rules is reproducible
/// from one run to the next. Any malformed file, unknown field or bad
/// match expression aborts the whole load before processing starts.
pub fn load_rules(dir: &Path) -> Result<RuleEngine, CorrelationError> {
	info!("reading vulnerability automation rules from {:?}", dir);

	let entries = fs::read_dir(dir).map_err(|e| {
		CorrelationError::Config(format!("cannot read rule directory {:?}: {}", dir, e))
	})?;

	let mut paths: Vec<_> = entries
		.filter_map(|entry| entry.ok().map(|e| e.path()))
		.filter(|path| path.extension().map_or(false, |ext| ext == "json"))
		.collect();
	paths.sort();

	let mut rules = Vec::new();
	for path in &paths {
		rules.extend(load_rule_file(path)?);
	}

	info!("loaded {} rules from {} rule files", rules.len(), paths.len());
	Ok(RuleEngine::new(rules))
}

fn load_rule_file(path: &Path) -> Result<Vec<Rule>, CorrelationError> {
	debug!("reading automation rules from {:?}", path);

	let raw = fs::read_to_string(path)
		.map_err(|e| CorrelationError::Config(format!("cannot read {:?}: {}", path, e)))?;

	let definitions: Vec<RuleDefinition> = serde_json::from_str(&raw)
		.map_err(|e| CorrelationError::Config(format!("malformed rule file {:?}: {}", path, e)))?;

	definitions
		.into_iter()
		.map(|definition| {
			Ok(Rule {
				target: MatchTarget::parse(&definition.target)?,
				name: definition.name,
				min_cvss: definition.mincvss,
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use anyhow::Result;
	use tempfile::tempdir;

	#[test]
	fn test_rules_load_in_sorted_file_order() -> Result<()> {
		let dir = tempdir()?;
		fs::write(
			dir.path().join("20-dmz.json"),
			r#"[{"name": "dmz", "mincvss": 7.0, "match": "10.1.0.0/24"}]"#,
		)?;
		fs::write(
			dir.path().join("10-corp.json"),
			r#"[
				{"name": "corp", "mincvss": 5.0, "match": "10.0.0.0/16"},
				{"name": "corp-web", "mincvss": 4.0, "match": "10.0.5.9"}
			]"#,
		)?;

		let engine = load_rules(dir.path())?;
		assert_eq!(engine.len(), 3);

		// corp comes from the lexically earlier file.
		let selected = engine.select("10.0.9.9")?.unwrap();
		assert_eq!(selected.name, "corp");
		Ok(())
	}

	#[test]
	fn test_non_json_files_are_ignored() -> Result<()> {
		let dir = tempdir()?;
		fs::write(dir.path().join("README.txt"), "not rules")?;
		fs::write(
			dir.path().join("rules.json"),
			r#"[{"name": "corp", "mincvss": 5.0, "match": "10.0.0.0/16"}]"#,
		)?;

		let engine = load_rules(dir.path())?;
		assert_eq!(engine.len(), 1);
		Ok(())
	}

	#[test]
	fn test_unknown_field_is_rejected() -> Result<()> {
		let dir = tempdir()?;
		fs::write(
			dir.path().join("rules.json"),
			r#"[{"name": "corp", "mincvss": 5.0, "match": "10.0.0.0/16", "matchon": "ip"}]"#,
		)?;

		let err = load_rules(dir.path()).unwrap_err();
		assert!(matches!(err, CorrelationError::Config(_)));
		Ok(())
	}

	#[test]
	fn test_bad_match_expression_is_rejected() -> Result<()> {
		let dir = tempdir()?;
		fs::write(
			dir.path().join("rules.json"),
			r#"[{"name": "corp", "mincvss": 5.0, "match": "10.0.0.0/40"}]"#,
		)?;

		let err = load_rules(dir.path()).unwrap_err();
		assert!(matches!(err, CorrelationError::Config(_)));
		Ok(())
	}
}
