//! Audit trail for dosing requests.
//!
//! The pipeline itself never persists anything. A surrounding layer turns
//! each outcome into an [`AuditRecord`] and decides where it goes; the CLI
//! appends one JSON line per request.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::types::DosingOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// Operator or upstream system that submitted the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    pub status: String,
    /// Echoed from the request body when it carried a usable number.
    pub melt_weight_kg: Option<f64>,
    pub processing_time_ms: u64,
    pub error_message: Option<String>,
    pub request: Value,
    pub response: Value,
}

impl AuditRecord {
    pub fn from_outcome(
        request: &Value,
        outcome: &DosingOutcome,
        elapsed: Duration,
        caller: Option<&str>,
    ) -> Self {
        let melt_weight_kg = match outcome.recommendation() {
            Some(r) => Some(r.melt_weight_kg),
            None => request.get("melt_weight_kg").and_then(Value::as_f64),
        };

        Self {
            timestamp: Utc::now(),
            caller: caller.map(str::to_string),
            status: outcome.status().to_string(),
            melt_weight_kg,
            processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            error_message: outcome.error_message().map(str::to_string),
            request: request.clone(),
            response: serde_json::to_value(outcome).unwrap_or(Value::Null),
        }
    }

    /// Append as a single JSON line, creating the file if needed.
    pub fn append_jsonl(&self, path: &Path) -> Result<()> {
        let line = serde_json::to_string(self).context("Failed to serialize audit record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open audit log: {}", path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("Failed to write audit log: {}", path.display()))?;
        tracing::debug!(path = %path.display(), status = %self.status, "Audit record written");
        Ok(())
    }
}
