use std::collections::BTreeSet;

/// Resolved execution plan for a pipeline.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Node indices (registration order) in execution order
    pub order: Vec<usize>,

    /// Every key the plan can produce, including the seed key
    pub available_keys: BTreeSet<String>,

    /// Resolution statistics
    pub stats: PlanStats,
}

/// Statistics about the resolved plan
#[derive(Debug, Clone, Default)]
pub struct PlanStats {
    /// Number of registered nodes
    pub total_nodes: usize,

    /// Relaxation scans needed to place every node
    pub passes: usize,

    /// Keys written by more than one node
    pub duplicate_outputs: Vec<String>,

    /// Resolution time in microseconds
    pub resolve_time_us: u64,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}
