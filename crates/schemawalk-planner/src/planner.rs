use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use schemawalk_common::{Error, Result, Version};
use tracing::debug;

use crate::graph::{Script, VersionGraph};
use crate::policy::DirectionPolicy;

/// One transition of a plan: run `script`, arriving at `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub end: Version,
    pub script: Script,
}

/// An ordered list of transitions from `start` to the last step's `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    start: Version,
    steps: Vec<PlanStep>,
}

impl MigrationPlan {
    pub fn new(start: Version, steps: Vec<PlanStep>) -> Self {
        Self { start, steps }
    }

    pub fn start(&self) -> Version {
        self.start
    }

    /// The version the database ends up at once every step has run.
    pub fn end(&self) -> Version {
        self.steps.last().map_or(self.start, |step| step.end)
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Every version visited, starting with `start`.
    pub fn versions(&self) -> Vec<Version> {
        std::iter::once(self.start)
            .chain(self.steps.iter().map(|step| step.end))
            .collect()
    }
}

impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain: Vec<String> = self.versions().iter().map(|v| v.to_string()).collect();
        f.write_str(&chain.join(" -> "))
    }
}

/// Find the cheapest path from `start` to `end` under `policy`.
///
/// Dijkstra with a linear frontier scan. The search stops as soon as `end` is
/// settled or no finite-cost node remains unsettled. Synthesized reset edges
/// are only followed when `policy` allows a reset.
pub fn plan(
    graph: &VersionGraph,
    start: Version,
    end: Version,
    policy: DirectionPolicy,
) -> Result<MigrationPlan> {
    for version in [start, end] {
        if !graph.contains(version) {
            return Err(Error::UnknownVersion(version));
        }
    }

    let mut settled: BTreeSet<Version> = BTreeSet::new();
    let mut parents: BTreeMap<Version, Option<Version>> = BTreeMap::new();
    let mut costs: BTreeMap<Version, u32> = BTreeMap::new();
    parents.insert(start, None);
    costs.insert(start, 0);

    loop {
        let next = costs
            .iter()
            .filter(|(node, _)| !settled.contains(*node))
            .min_by_key(|(_, cost)| **cost)
            .map(|(node, cost)| (*node, *cost));

        let Some((current, current_cost)) = next else {
            break;
        };
        if current == end {
            break;
        }

        for (neighbour, transition) in graph.outgoing(current) {
            // synthesized resets require a reset-allowing policy
            if transition.is_reset() && !policy.allows_reset() {
                continue;
            }
            let Some(step_cost) = policy.cost(current, neighbour) else {
                continue;
            };
            let candidate = current_cost + step_cost;
            if costs.get(&neighbour).is_none_or(|known| candidate < *known) {
                costs.insert(neighbour, candidate);
                parents.insert(neighbour, Some(current));
            }
        }
        settled.insert(current);
    }

    let not_found = || Error::PathNotFound { start, end };

    let mut path = Vec::new();
    let mut cursor = Some(end);
    while let Some(node) = cursor {
        let parent = parents.get(&node).ok_or_else(not_found)?;
        path.push(node);
        cursor = *parent;
    }
    path.reverse();

    let steps = path
        .windows(2)
        .map(|pair| {
            let transition = graph.transition(pair[0], pair[1]).ok_or_else(not_found)?;
            Ok(PlanStep {
                end: pair[1],
                script: Arc::clone(&transition.script),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let plan = MigrationPlan::new(start, steps);
    debug!("planned {policy} migration: {plan}");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bidirectional() -> VersionGraph {
        VersionGraph::build(
            [],
            [
                ((0, 1), "script_0_1"),
                ((1, 2), "script_1_2"),
                ((2, 1), "script_2_1"),
                ((1, 0), "script_1_0"),
            ],
            "drop",
        )
    }

    fn forward_only() -> VersionGraph {
        VersionGraph::build([], [((0, 1), "script_0_1"), ((1, 2), "script_1_2")], "drop")
    }

    fn step_pairs(plan: &MigrationPlan) -> Vec<(Version, &str)> {
        plan.steps()
            .iter()
            .map(|step| (step.end, &*step.script))
            .collect()
    }

    #[test]
    fn upgrade_walks_forward_edges() {
        let plan = bidirectional()
            .plan_migration(0, 2, DirectionPolicy::upgrade())
            .unwrap();
        assert_eq!(plan.start(), 0);
        assert_eq!(step_pairs(&plan), vec![(1, "script_0_1"), (2, "script_1_2")]);
        assert_eq!(plan.end(), 2);
    }

    #[test]
    fn downgrade_walks_backward_edges() {
        let plan = bidirectional()
            .plan_migration(2, 0, DirectionPolicy::downgrade())
            .unwrap();
        assert_eq!(step_pairs(&plan), vec![(1, "script_2_1"), (0, "script_1_0")]);
    }

    #[test]
    fn downgrade_without_backward_scripts_has_no_path() {
        let err = forward_only()
            .plan_migration(2, 0, DirectionPolicy::downgrade())
            .unwrap_err();
        assert!(matches!(err, Error::PathNotFound { start: 2, end: 0 }));
    }

    #[test]
    fn downgrade_ignores_synthesized_reset() {
        // 2 -> 0 via the reset edge would be one step, but only force-upgrade may take it
        let plan = bidirectional()
            .plan_migration(2, 0, DirectionPolicy::downgrade())
            .unwrap();
        assert_eq!(plan.len(), 2);

        let graph = VersionGraph::build(
            [],
            [((0, 1), "a"), ((1, 2), "b"), ((2, 0), "down")],
            "drop",
        );
        let plan = graph
            .plan_migration(2, 0, DirectionPolicy::downgrade())
            .unwrap();
        assert_eq!(step_pairs(&plan), vec![(0, "down")]);
    }

    #[test]
    fn same_version_yields_empty_plan() {
        let graph = bidirectional();
        for policy in [
            DirectionPolicy::upgrade(),
            DirectionPolicy::force_upgrade(),
            DirectionPolicy::downgrade(),
        ] {
            for version in 0..=2 {
                let plan = graph.plan_migration(version, version, policy).unwrap();
                assert!(plan.is_empty());
                assert_eq!(plan.end(), version);
            }
        }
    }

    #[test]
    fn force_upgrade_resets_in_one_step() {
        let graph = forward_only();
        for version in 1..=2 {
            let plan = graph
                .plan_migration(version, 0, DirectionPolicy::force_upgrade())
                .unwrap();
            assert_eq!(step_pairs(&plan), vec![(0, "drop")]);
        }
    }

    #[test]
    fn force_upgrade_prefers_explicit_downgrade_to_empty() {
        let plan = bidirectional()
            .plan_migration(1, 0, DirectionPolicy::force_upgrade())
            .unwrap();
        assert_eq!(step_pairs(&plan), vec![(0, "script_1_0")]);
    }

    #[test]
    fn force_upgrade_rebuilds_through_empty() {
        // 2 -> 3 has no forward script, so the only way is drop and rebuild.
        let graph = VersionGraph::build(
            [],
            [((0, 1), "a"), ((1, 2), "b"), ((0, 3), "c"), ((2, 3), "d")],
            "drop",
        );
        let graph_without_bridge =
            VersionGraph::build([], [((0, 1), "a"), ((1, 2), "b"), ((0, 3), "c")], "drop");

        let direct = graph
            .plan_migration(2, 3, DirectionPolicy::force_upgrade())
            .unwrap();
        assert_eq!(step_pairs(&direct), vec![(3, "d")]);

        assert!(matches!(
            graph_without_bridge.plan_migration(2, 3, DirectionPolicy::upgrade()),
            Err(Error::PathNotFound { .. })
        ));
        let rebuilt = graph_without_bridge
            .plan_migration(2, 3, DirectionPolicy::force_upgrade())
            .unwrap();
        assert_eq!(step_pairs(&rebuilt), vec![(0, "drop"), (3, "c")]);
    }

    #[test]
    fn prefers_fewest_steps() {
        let graph = VersionGraph::build(
            [],
            [((0, 1), "a"), ((1, 2), "b"), ((2, 3), "c"), ((1, 3), "skip")],
            "drop",
        );
        let plan = graph
            .plan_migration(0, 3, DirectionPolicy::upgrade())
            .unwrap();
        assert_eq!(step_pairs(&plan), vec![(1, "a"), (3, "skip")]);
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let graph = forward_only();
        assert!(matches!(
            graph.plan_migration(5, 1, DirectionPolicy::upgrade()),
            Err(Error::UnknownVersion(5))
        ));
        assert!(matches!(
            graph.plan_migration(0, 9, DirectionPolicy::upgrade()),
            Err(Error::UnknownVersion(9))
        ));
    }

    #[test]
    fn unreachable_declared_version_has_no_path() {
        let graph = VersionGraph::build([4], [((0, 1), "a")], "drop");
        assert!(matches!(
            graph.plan_migration(0, 4, DirectionPolicy::upgrade()),
            Err(Error::PathNotFound { start: 0, end: 4 })
        ));
    }

    #[test]
    fn display_renders_version_chain() {
        let plan = bidirectional()
            .plan_migration(0, 2, DirectionPolicy::upgrade())
            .unwrap();
        assert_eq!(plan.to_string(), "0 -> 1 -> 2");
        assert_eq!(plan.versions(), vec![0, 1, 2]);
        assert_eq!(plan.len(), 2);
    }
}
