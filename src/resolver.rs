//! Dependency resolution: topological ordering with partial-failure
//! isolation.
//!
//! The resolver is a pure function over a descriptor snapshot. It never
//! mutates the registry; callers apply the returned failure set themselves.

use crate::descriptor::{PluginDescriptor, PluginId};
use crate::error::FailureReason;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Result of one resolution pass.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Valid initialization order for the acyclic, dependency-satisfied
    /// remainder. Every dependency appears strictly before its dependents;
    /// ties are broken by input (registration) order.
    pub order: Vec<PluginId>,

    /// Ids excluded from the order, with the failure class for each, in
    /// input order.
    pub failed: Vec<(PluginId, FailureReason)>,

    /// Ids that cooperate in at least one dependency cycle, reported as a
    /// group so callers can log the cycle set in one place.
    pub cycle_members: Vec<PluginId>,
}

impl Resolution {
    /// Look up the failure class assigned to an id, if any.
    pub fn failure_of(&self, id: &PluginId) -> Option<FailureReason> {
        self.failed
            .iter()
            .find(|(failed_id, _)| failed_id == id)
            .map(|(_, reason)| *reason)
    }
}

/// Computes initialization order over the registry's dependency graph.
#[derive(Debug, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    /// Resolve an initialization order from a descriptor snapshot.
    ///
    /// Three failure classes are isolated, letting the rest of the graph
    /// initialize normally:
    /// - `MissingDependency`: a declared dependency is absent from the
    ///   snapshot;
    /// - `FailedDependency`: the id transitively depends on a missing-dep
    ///   or cyclic id;
    /// - `CycleDetected`: the id lies on a dependency cycle.
    pub fn resolve(descriptors: &[PluginDescriptor]) -> Resolution {
        let n = descriptors.len();
        let mut position: HashMap<&PluginId, usize> = HashMap::with_capacity(n);
        for (idx, descriptor) in descriptors.iter().enumerate() {
            position.insert(&descriptor.id, idx);
        }

        // Deduplicated dependency edges, split into known targets and
        // missing ids.
        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut reasons: HashMap<usize, FailureReason> = HashMap::new();

        for (idx, descriptor) in descriptors.iter().enumerate() {
            let mut unique: HashSet<&PluginId> = HashSet::new();
            for dep in &descriptor.dependencies {
                if !unique.insert(dep) {
                    continue;
                }
                match position.get(dep) {
                    Some(&dep_idx) => {
                        deps[idx].push(dep_idx);
                        dependents[dep_idx].push(idx);
                    },
                    None => {
                        tracing::warn!(
                            plugin_id = %descriptor.id,
                            dependency = %dep,
                            "Plugin depends on an unregistered id"
                        );
                        reasons.entry(idx).or_insert(FailureReason::MissingDependency);
                    },
                }
            }
        }

        // Everything transitively depending on a missing-dep id fails with
        // FailedDependency.
        let mut queue: VecDeque<usize> = reasons.keys().copied().collect();
        while let Some(idx) = queue.pop_front() {
            for &dependent in &dependents[idx] {
                if let std::collections::hash_map::Entry::Vacant(slot) = reasons.entry(dependent) {
                    slot.insert(FailureReason::FailedDependency);
                    queue.push_back(dependent);
                }
            }
        }

        // Kahn's algorithm over the surviving subgraph. The ready heap is
        // keyed by input position so independent ids come out in
        // registration order.
        let mut in_degree: Vec<usize> = vec![0; n];
        let mut heap: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
        for idx in 0..n {
            if reasons.contains_key(&idx) {
                continue;
            }
            in_degree[idx] = deps[idx]
                .iter()
                .filter(|dep_idx| !reasons.contains_key(*dep_idx))
                .count();
            if in_degree[idx] == 0 {
                heap.push(Reverse(idx));
            }
        }

        let mut order: Vec<PluginId> = Vec::new();
        let mut ordered: HashSet<usize> = HashSet::new();
        while let Some(Reverse(idx)) = heap.pop() {
            ordered.insert(idx);
            order.push(descriptors[idx].id.clone());
            for &dependent in &dependents[idx] {
                if reasons.contains_key(&dependent) {
                    continue;
                }
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    heap.push(Reverse(dependent));
                }
            }
        }

        // Leftovers with unresolved in-degree are either on a cycle or on a
        // path into one. Exact cycle membership is a self-reachability
        // check over the leftover subgraph.
        let leftover: Vec<usize> = (0..n)
            .filter(|idx| !reasons.contains_key(idx) && !ordered.contains(idx))
            .collect();
        let leftover_set: HashSet<usize> = leftover.iter().copied().collect();
        let mut cycle_members: Vec<PluginId> = Vec::new();

        for &start in &leftover {
            if Self::reaches_itself(start, &deps, &leftover_set) {
                reasons.insert(start, FailureReason::CycleDetected);
                cycle_members.push(descriptors[start].id.clone());
            } else {
                reasons.insert(start, FailureReason::FailedDependency);
            }
        }

        if !cycle_members.is_empty() {
            tracing::warn!(members = ?cycle_members, "Dependency cycle detected");
        }

        let failed: Vec<(PluginId, FailureReason)> = (0..n)
            .filter_map(|idx| reasons.get(&idx).map(|r| (descriptors[idx].id.clone(), *r)))
            .collect();

        Resolution { order, failed, cycle_members }
    }

    /// Depth-first walk along dependency edges restricted to `within`,
    /// checking whether `start` can reach itself.
    fn reaches_itself(start: usize, deps: &[Vec<usize>], within: &HashSet<usize>) -> bool {
        let mut stack: Vec<usize> = deps[start]
            .iter()
            .copied()
            .filter(|idx| within.contains(idx))
            .collect();
        let mut visited: HashSet<usize> = HashSet::new();

        while let Some(idx) = stack.pop() {
            if idx == start {
                return true;
            }
            if !visited.insert(idx) {
                continue;
            }
            for &dep in &deps[idx] {
                if within.contains(&dep) {
                    stack.push(dep);
                }
            }
        }
        false
    }
}
