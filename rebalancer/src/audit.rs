//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use holdbook::{AccountBalance, PortfolioSnapshot, RebalancePlan};
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn log_run_started(
    audit: &mut AuditLog,
    command: &str,
    payload_file: &str,
    account_id: &str,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "command": command,
            "payload_file": payload_file,
            "account": account_id,
        }),
    )
}

pub fn log_payload_normalized(audit: &mut AuditLog, account: &AccountBalance) -> Result<()> {
    audit.log(
        "payload_normalized",
        serde_json::json!({
            "format": account.format.tag(),
            "account": account.account_id,
            "holdings": account.holdings.len(),
            "skipped_lines": account.skipped_lines,
            "krw_deposit": account.cash.krw.map(|d| d.to_string()),
            "usd_deposit": account.cash.usd.map(|d| d.to_string()),
        }),
    )
}

pub fn log_snapshot_built(audit: &mut AuditLog, snapshot: &PortfolioSnapshot) -> Result<()> {
    let lines: Vec<_> = snapshot
        .lines
        .iter()
        .map(|l| {
            serde_json::json!({
                "id": l.id,
                "value": l.value.to_string(),
                "ratio": l.ratio,
                "color": l.color.to_string(),
            })
        })
        .collect();

    audit.log(
        "snapshot_built",
        serde_json::json!({
            "currency": snapshot.reporting_currency.code(),
            "total": snapshot.total_value.to_string(),
            "lines": lines,
        }),
    )
}

pub fn log_plan_computed(audit: &mut AuditLog, plan: &RebalancePlan) -> Result<()> {
    let lines: Vec<_> = plan
        .lines
        .iter()
        .map(|l| {
            serde_json::json!({
                "id": l.line_ref,
                "action": l.action().to_string(),
                "target": l.target_ratio,
                "current": l.current_ratio,
                "amount": l.rebalance_amount.to_string(),
                "shares": l.required_shares.map(|s| s.shares.to_string()),
                "approximate": l.required_shares.is_some_and(|s| s.is_approximate()),
            })
        })
        .collect();

    audit.log(
        "plan_computed",
        serde_json::json!({
            "currency": plan.reporting_currency.code(),
            "total_balance": plan.total_balance.to_string(),
            "tracking_error_pct": plan.tracking_error_pct,
            "lines": lines,
        }),
    )
}

pub fn log_run_completed(audit: &mut AuditLog, lines: usize, approximate: usize) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "lines": lines,
            "approximate": approximate,
        }),
    )
}
