//! Byte-accurate capacity accounting for the key-value store.

use folio_core::KeyValueStore;
use folio_core::config::CapacityLimits;
use folio_core::error::Result;
use serde::{Deserialize, Serialize};

/// Snapshot of store usage against the configured quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityStatus {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub remaining_bytes: u64,
    pub percent_used: f64,
    pub warning: bool,
    pub critical: bool,
}

/// Result of a pre-write quota check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub needed_bytes: u64,
    pub available_bytes: u64,
    pub reason: Option<String>,
}

/// Measures the store and gates writes against a fixed byte quota.
#[derive(Debug, Clone, Default)]
pub struct CapacityMonitor {
    limits: CapacityLimits,
}

impl CapacityMonitor {
    pub fn new(limits: CapacityLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &CapacityLimits {
        &self.limits
    }

    /// Total UTF-8 byte size of every key and value in `store`.
    pub fn size_of_store(&self, store: &dyn KeyValueStore) -> Result<u64> {
        let mut total = 0u64;
        for key in store.keys()? {
            let value_len = store.get(&key)?.map(|v| v.len()).unwrap_or(0);
            total += entry_size(&key, value_len);
        }
        Ok(total)
    }

    pub fn status(&self, store: &dyn KeyValueStore) -> Result<CapacityStatus> {
        let used = self.size_of_store(store)?;
        Ok(self.status_for(used))
    }

    /// Builds the status for an already measured usage.
    pub fn status_for(&self, used_bytes: u64) -> CapacityStatus {
        let total = self.limits.quota_bytes;
        CapacityStatus {
            used_bytes,
            total_bytes: total,
            remaining_bytes: total.saturating_sub(used_bytes),
            percent_used: used_bytes as f64 / total as f64 * 100.0,
            warning: used_bytes > self.limits.warning_threshold_bytes,
            critical: used_bytes as f64 > total as f64 * self.limits.critical_ratio,
        }
    }

    /// Checks whether `additional_bytes` more would still fit in the quota.
    pub fn check(&self, store: &dyn KeyValueStore, additional_bytes: u64) -> Result<QuotaCheck> {
        let used = self.size_of_store(store)?;
        Ok(self.check_with_usage(used, additional_bytes))
    }

    /// Quota check against an already measured usage.
    pub fn check_with_usage(&self, used_bytes: u64, additional_bytes: u64) -> QuotaCheck {
        let status = self.status_for(used_bytes);
        let allowed = used_bytes.saturating_add(additional_bytes) <= status.total_bytes;
        QuotaCheck {
            allowed,
            needed_bytes: additional_bytes,
            available_bytes: status.remaining_bytes,
            reason: (!allowed).then(|| {
                format!(
                    "Need {} bytes ({}), only {} bytes ({}) available",
                    additional_bytes,
                    format_bytes(additional_bytes),
                    status.remaining_bytes,
                    format_bytes(status.remaining_bytes)
                )
            }),
        }
    }
}

/// Byte footprint of one stored entry.
pub fn entry_size(key: &str, value_len: usize) -> u64 {
    (key.len() + value_len) as u64
}

/// Human-readable byte count (`512B`, `1.5KB`, `4.00MB`).
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    if bytes < KIB {
        format!("{}B", bytes)
    } else if bytes < MIB {
        format!("{:.1}KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.2}MB", bytes as f64 / MIB as f64)
    }
}
