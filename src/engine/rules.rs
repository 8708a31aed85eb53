// src/engine/rules.rs

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use log::debug;

use crate::error::CorrelationError;

/// Score returned when a target does not cover the candidate address.
const SCORE_MISS: i32 = -1;

/// Score for an exact single-address match, above any network prefix.
const SCORE_EXACT: i32 = 32;

/// The network scope of one rule: either a single host or a CIDR block.
#[derive(Debug, Clone)]
pub enum MatchTarget {
	Single(Ipv4Addr),
	Network(Ipv4Network),
}

impl MatchTarget {
	/// Parses a rule match expression. A value containing `/` is read as a
	/// CIDR network, anything else as a single IPv4 address.
	pub fn parse(value: &str) -> Result<Self, CorrelationError> {
		if value.contains('/') {
			value
				.parse::<Ipv4Network>()
				.map(MatchTarget::Network)
				.map_err(|_| {
					CorrelationError::Config(format!("invalid match network '{}'", value))
				})
		} else {
			value
				.parse::<Ipv4Addr>()
				.map(MatchTarget::Single)
				.map_err(|_| {
					CorrelationError::Config(format!("invalid match address '{}'", value))
				})
		}
	}

	/// Scores how specifically this target covers `address`.
	///
	/// An exact single-address match scores 32, a containing network scores
	/// its prefix length, and a miss scores -1. Only the variant that is
	/// actually configured is tested.
	pub fn score(&self, address: &str) -> Result<i32, CorrelationError> {
		let ip: Ipv4Addr = address
			.parse()
			.map_err(|_| CorrelationError::InvalidAddress(address.to_string()))?;

		let score = match self {
			MatchTarget::Single(single) => {
				if *single == ip {
					SCORE_EXACT
				} else {
					SCORE_MISS
				}
			}
			MatchTarget::Network(network) => {
				if network.contains(ip) {
					i32::from(network.prefix())
				} else {
					SCORE_MISS
				}
			}
		};
		Ok(score)
	}
}

/// A named escalation policy bound to a network scope.
#[derive(Debug, Clone)]
pub struct Rule {
	pub name: String,
	pub min_cvss: f64,
	pub target: MatchTarget,
}

/// Holds every loaded rule and answers "which rule governs this address".
///
/// Rule order is load order and must stay stable: ties on specificity are
/// broken in favour of the earliest rule.
#[derive(Debug)]
pub struct RuleEngine {
	rules: Vec<Rule>,
}

impl RuleEngine {
	pub fn new(rules: Vec<Rule>) -> Self {
		Self { rules }
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	/// Selects the most specific rule covering `address`.
	///
	/// Linear scan keeping the strictly greatest score seen so far, so an
	/// equally specific later rule never displaces an earlier one. Returns
	/// `None` when no rule covers the address at all.
	pub fn select(&self, address: &str) -> Result<Option<&Rule>, CorrelationError> {
		let mut best: Option<&Rule> = None;
		let mut high = SCORE_MISS;

		for rule in &self.rules {
			let score = rule.target.score(address)?;
			if score > high {
				high = score;
				best = Some(rule);
			}
		}

		match best {
			Some(rule) => debug!("address {} matched rule '{}' (score {})", address, rule.name, high),
			None => debug!("no rule matches address {}", address),
		}
		Ok(best)
	}
}
