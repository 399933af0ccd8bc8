//! Response types returned by the audit query service.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::AuditRecord;

/// One page of a filtered, sorted audit query.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditPage {
    pub entries: Vec<AuditRecord>,
    /// Size of the filtered set, not of the whole trail.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// `ceil(total / page_size)`; zero when either is zero.
#[must_use]
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}

/// Count of entries within a trailing window, for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RecentCount {
    pub window_hours: u32,
    pub count: u64,
}
