use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, info, warn};

use crate::{
    error::{PipelineError, Result},
    models::status::{StatusCode, StatusRecord, StatusUpdate},
};

/// Volatile trace-id → [`StatusRecord`] map shared by the ingress and every stage.
///
/// Each write holds only the shard lock of its key and never awaits, so
/// per-key merges are atomic and no lock is held across broker I/O.
#[derive(Debug, Default)]
pub struct StatusStore {
    records: DashMap<String, StatusRecord>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `update` into the record for `trace_id`, creating it if absent.
    pub fn set(&self, trace_id: &str, update: StatusUpdate) -> StatusRecord {
        match self.records.entry(trace_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let previous = entry.get().status;
                entry.get_mut().merge(update);
                let record = entry.get().clone();
                debug!(
                    trace_id,
                    previous = ?previous,
                    status = ?record.status,
                    "Status record merged"
                );
                record
            }
            Entry::Vacant(entry) => {
                let mut record = StatusRecord::new(trace_id);
                record.merge(update);
                debug!(trace_id, status = ?record.status, "Status record created");
                entry.insert(record).value().clone()
            }
        }
    }

    pub fn get(&self, trace_id: &str) -> Option<StatusRecord> {
        let record = self.records.get(trace_id).map(|entry| entry.value().clone());
        if record.is_none() {
            debug!(trace_id, "Status record not found");
        }
        record
    }

    /// Sets only the status. A missing key gets a minimal `{traceId, status}` record.
    pub fn update_status(&self, trace_id: &str, status: StatusCode) -> StatusRecord {
        let mut entry = self.records.entry(trace_id.to_string()).or_insert_with(|| {
            warn!(trace_id, "Status record missing, creating a minimal one");
            StatusRecord::new(trace_id)
        });

        let previous = entry.status;
        entry.set_status(status);

        info!(
            trace_id,
            previous = ?previous,
            status = %status,
            "Status updated"
        );

        entry.value().clone()
    }

    /// Like [`update_status`](Self::update_status) but refuses to leave a terminal status.
    pub fn advance(&self, trace_id: &str, status: StatusCode) -> Result<StatusRecord> {
        let mut entry = self.records.entry(trace_id.to_string()).or_insert_with(|| {
            warn!(trace_id, "Status record missing, creating a minimal one");
            StatusRecord::new(trace_id)
        });

        if let Some(current) = entry.status.filter(|current| current.is_terminal()) {
            return Err(PipelineError::TerminalStatus {
                trace_id: trace_id.to_string(),
                status: current,
            });
        }

        let previous = entry.status;
        entry.set_status(status);

        info!(
            trace_id,
            previous = ?previous,
            status = %status,
            "Status advanced"
        );

        Ok(entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
