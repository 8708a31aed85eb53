// src/models/workflow.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::vulnerability::Vulnerability;

/// Handling state of a workflow element. Stored as an integer code so new
/// states can be appended without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
	NotHandled,
	Escalated,
}

impl WorkflowStatus {
	pub fn from_code(code: i64) -> Self {
		match code {
			1 => WorkflowStatus::Escalated,
			_ => WorkflowStatus::NotHandled,
		}
	}

	pub fn code(self) -> i64 {
		match self {
			WorkflowStatus::NotHandled => 0,
			WorkflowStatus::Escalated => 1,
		}
	}
}

/// One unit of tracked remediation work: a persisted vulnerability plus
/// its handling state. Status transitions happen in the store only, after
/// the downstream sink has accepted an escalation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowElement {
	pub workflow_id: i64,
	pub vulnerability: Vulnerability,
	pub last_handled: Option<NaiveDateTime>,
	pub contact: String,
	pub status: WorkflowStatus,
}

/// Outbound escalation payload handed to the event dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRequest {
	pub workflow_id: i64,
	pub vulnerability: Vulnerability,
	pub last_handled: Option<NaiveDateTime>,
	pub contact: String,
	pub status: WorkflowStatus,
}

impl EscalationRequest {
	pub fn from_element(element: &WorkflowElement) -> Self {
		Self {
			workflow_id: element.workflow_id,
			vulnerability: element.vulnerability.clone(),
			last_handled: element.last_handled,
			contact: element.contact.clone(),
			status: element.status,
		}
	}
}
