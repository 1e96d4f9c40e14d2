use super::error::{PipelineError, PipelineResult};
use super::node::ProcessingNode;
use super::plan::{ExecutionPlan, PlanStats};
use std::collections::BTreeSet;

/// Orders nodes so every node runs after the producers of its inputs.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Resolve an execution order starting from the `seed` key.
    ///
    /// Repeated relaxation: each scan walks the unplaced nodes in registration
    /// order and places every node whose requirements are available; its
    /// outputs become available immediately, so later nodes in the same scan
    /// can use them. The result is deterministic and stable with respect to
    /// registration order.
    ///
    /// # Errors
    /// `UnresolvedDependencies` when a scan places nothing. The error lists
    /// the sorted missing keys and the names of the nodes left unplaced.
    pub fn resolve<N: ProcessingNode>(nodes: &[N], seed: &str) -> PipelineResult<ExecutionPlan> {
        let start_time = std::time::Instant::now();

        let mut available: BTreeSet<String> = BTreeSet::from([seed.to_string()]);
        let mut pending: Vec<usize> = (0..nodes.len()).collect();
        let mut order = Vec::with_capacity(nodes.len());
        let mut passes = 0;

        while !pending.is_empty() {
            passes += 1;
            let before = pending.len();
            pending.retain(|&idx| {
                let node = &nodes[idx];
                if node.requires().iter().all(|key| available.contains(key)) {
                    available.extend(node.produces().iter().cloned());
                    order.push(idx);
                    false
                } else {
                    true
                }
            });

            if pending.len() == before {
                let missing: BTreeSet<String> = pending
                    .iter()
                    .flat_map(|&idx| nodes[idx].requires())
                    .filter(|key| !available.contains(*key))
                    .cloned()
                    .collect();
                let blocked = pending
                    .iter()
                    .map(|&idx| nodes[idx].name().to_string())
                    .collect();
                return Err(PipelineError::UnresolvedDependencies {
                    missing: missing.into_iter().collect(),
                    blocked,
                });
            }
        }

        let stats = PlanStats {
            total_nodes: nodes.len(),
            passes,
            duplicate_outputs: Self::duplicate_outputs(nodes),
            resolve_time_us: start_time.elapsed().as_micros() as u64,
        };

        Ok(ExecutionPlan {
            order,
            available_keys: available,
            stats,
        })
    }

    /// Keys declared as outputs by more than one node.
    fn duplicate_outputs<N: ProcessingNode>(nodes: &[N]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut dupes = BTreeSet::new();
        for key in nodes.iter().flat_map(|n| n.produces()) {
            if !seen.insert(key.as_str()) {
                dupes.insert(key.clone());
            }
        }
        dupes.into_iter().collect()
    }
}
