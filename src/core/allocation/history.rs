use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::metrics::SystemMetrics;
use super::types::ResourceAllocation;

pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// One applied change of the current allocation
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAdjustment {
    pub reason: String,
    pub previous: ResourceAllocation,
    pub new: ResourceAllocation,
    pub metrics_at_change: SystemMetrics,
    pub timestamp: DateTime<Utc>,
}

impl ResourceAdjustment {
    pub fn is_emergency(&self) -> bool {
        self.reason == super::emergency::EMERGENCY_REASON
    }
}

/// Bounded log of applied adjustments, oldest evicted first
#[derive(Debug, Clone)]
pub struct AdjustmentHistory {
    capacity: usize,
    entries: VecDeque<ResourceAdjustment>,
}

impl AdjustmentHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, adjustment: ResourceAdjustment) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(adjustment);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ResourceAdjustment> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ResourceAdjustment> {
        self.entries.back()
    }

    pub fn to_vec(&self) -> Vec<ResourceAdjustment> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for AdjustmentHistory {
    fn default() -> Self {
        Self::new()
    }
}
