// src/utils/event_dispatcher.rs

use anyhow::{Context, Result};
use log::{info, warn};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::models::workflow::EscalationRequest;
use crate::repositories::workflow_repo::WorkflowRepository;

/// Hands escalation requests to the downstream event sink.
///
/// Only an accepted (2xx) response transitions the workflow element to
/// escalated, and that transition happens in the store. With no endpoint
/// configured the dispatcher logs each payload and leaves state alone, so
/// the next scan emits the same set again.
pub struct EventDispatcher {
	client: reqwest::Client,
	endpoint: Option<String>,
	workflow: WorkflowRepository,
}

impl EventDispatcher {
	pub fn new(workflow: WorkflowRepository, endpoint: Option<String>) -> Result<Self> {
		let mut headers = HeaderMap::new();
		headers.insert(
			USER_AGENT,
			HeaderValue::from_static("Vulnerability-Correlator/1.0"),
		);

		let client = reqwest::Client::builder()
			.default_headers(headers)
			.build()
			.context("Failed to create HTTP client")?;

		Ok(Self {
			client,
			endpoint,
			workflow,
		})
	}

	/// Dispatches every request, returning how many the sink accepted.
	pub async fn dispatch(&self, requests: &[EscalationRequest]) -> Result<usize> {
		let endpoint = match &self.endpoint {
			Some(endpoint) => endpoint,
			None => {
				for request in requests {
					let payload = serde_json::to_string(request)
						.context("Failed to serialize escalation request")?;
					info!("escalation (no sink configured): {}", payload);
				}
				return Ok(0);
			}
		};

		let mut accepted = 0;
		for request in requests {
			let response = match self.client.post(endpoint).json(request).send().await {
				Ok(response) => response,
				Err(e) => {
					warn!(
						"failed to send escalation for workflow element {}: {}",
						request.workflow_id, e
					);
					continue;
				}
			};

			if response.status().is_success() {
				self.workflow.mark_escalated(request.workflow_id).await?;
				accepted += 1;
			} else {
				warn!(
					"escalation sink rejected workflow element {}: {}",
					request.workflow_id,
					response.status()
				);
			}
		}

		info!("dispatched {} of {} escalation events", accepted, requests.len());
		Ok(accepted)
	}
}
