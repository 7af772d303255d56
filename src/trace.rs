//! Trace recording for emulated calls.
//!
//! Transports that trace a call may push a *speculative* record as soon as
//! they see it. The dispatcher later replaces it with the authoritative
//! record, which knows the contract and function names and the decoded
//! arguments. [`TraceLog`] is the in-memory, append-only sink shared by all
//! wrapped contracts of a test run.

use crate::runtime::emulator::{EmulatorOutcome, ExecutionStatus, Receipt};
use ethers_core::types::{Address, Bytes, U256};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to write trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialise trace: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One traced call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub contract: String,
    pub function: String,
    pub args: Vec<String>,
    /// Contract arguments given by name.
    pub kwargs: BTreeMap<String, String>,
    /// Sender of an execution; `None` for simulated calls.
    pub caller: Option<Address>,
    /// Native value attached to an execution, when non-zero.
    pub value: Option<U256>,
    pub status: ExecutionStatus,
    pub return_data: Bytes,
    pub receipt: Option<Receipt>,
    /// Pushed by a transport before the dispatcher knew what was called.
    pub speculative: bool,
}

impl TraceRecord {
    /// A placeholder record as a transport sees it: an address and raw calldata.
    pub fn speculative(address: Address, calldata: &[u8], outcome: &EmulatorOutcome) -> Self {
        let selector = calldata.get(..4).map(hex::encode).unwrap_or_default();
        Self {
            contract: format!("{address:?}"),
            function: format!("0x{selector}"),
            args: vec![format!("0x{}", hex::encode(calldata))],
            kwargs: BTreeMap::new(),
            caller: None,
            value: None,
            status: outcome.status.clone(),
            return_data: outcome.return_data.clone(),
            receipt: outcome.receipt.clone(),
            speculative: true,
        }
    }
}

/// Destination for trace records.
pub trait TraceSink: Send + Sync {
    /// Append `record`.
    fn record(&self, record: TraceRecord) -> Result<(), TraceError>;

    /// Drop the most recent speculative record. A no-op when none is pending.
    fn discard_last(&self) -> Result<(), TraceError>;

    /// Replace the pending speculative record, if any, with `record`.
    fn commit(&self, record: TraceRecord) -> Result<(), TraceError> {
        self.discard_last()?;
        self.record(record)
    }
}

/// Shared, ordered, append-only trace log.
#[derive(Debug, Default)]
pub struct TraceLog {
    records: Mutex<Vec<TraceRecord>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in completion order.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Write the log as a pretty-printed JSON array.
    pub fn write_json(&self, path: &Path) -> Result<(), TraceError> {
        let json = serde_json::to_string_pretty(&*self.records.lock())?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Trace written");
        Ok(())
    }
}

fn drop_last_speculative(records: &mut Vec<TraceRecord>) {
    if let Some(index) = records.iter().rposition(|r| r.speculative) {
        records.remove(index);
    }
}

impl TraceSink for TraceLog {
    fn record(&self, record: TraceRecord) -> Result<(), TraceError> {
        self.records.lock().push(record);
        Ok(())
    }

    fn discard_last(&self) -> Result<(), TraceError> {
        drop_last_speculative(&mut self.records.lock());
        Ok(())
    }

    fn commit(&self, record: TraceRecord) -> Result<(), TraceError> {
        let mut records = self.records.lock();
        drop_last_speculative(&mut records);
        records.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(function: &str) -> TraceRecord {
        TraceRecord {
            contract: "Counter".into(),
            function: function.into(),
            args: vec![],
            kwargs: BTreeMap::new(),
            caller: None,
            value: None,
            status: ExecutionStatus::Succeeded,
            return_data: Bytes::default(),
            receipt: None,
            speculative: false,
        }
    }

    #[test]
    fn discard_with_nothing_pending_is_a_noop() {
        let log = TraceLog::new();
        log.discard_last().unwrap();
        log.record(record("a")).unwrap();
        log.discard_last().unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn commit_replaces_speculative_entry() {
        let log = TraceLog::new();
        let outcome = EmulatorOutcome::success(vec![0u8; 32]);
        log.record(TraceRecord::speculative(Address::zero(), &[1, 2, 3, 4, 5], &outcome))
            .unwrap();
        log.commit(record("increment")).unwrap();

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].function, "increment");
        assert!(!records[0].speculative);
    }

    #[test]
    fn speculative_record_names_selector() {
        let outcome = EmulatorOutcome::reverted(Vec::<u8>::new());
        let rec = TraceRecord::speculative(Address::zero(), &[0xd0, 0x9d, 0xe0, 0x8a], &outcome);
        assert_eq!(rec.function, "0xd09de08a");
        assert_eq!(rec.status, ExecutionStatus::Reverted);
    }

    #[test]
    fn concurrent_commits_keep_one_record_each() {
        let log = Arc::new(TraceLog::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    let outcome = EmulatorOutcome::success(Vec::<u8>::new());
                    log.record(TraceRecord::speculative(Address::zero(), &[], &outcome))
                        .unwrap();
                    log.commit(record(&format!("f{i}"))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let records = log.records();
        assert_eq!(records.len(), 8);
        assert!(records.iter().all(|r| !r.speculative));
    }

    #[test]
    fn writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");
        let log = TraceLog::new();
        log.record(record("increment")).unwrap();
        log.write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json[0]["function"], "increment");
        assert_eq!(json[0]["status"], "succeeded");
    }
}
