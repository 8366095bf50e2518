use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use schemawalk_common::{EMPTY_VERSION, Result, Version};
use tracing::debug;

use crate::catalog::TransitionCatalog;
use crate::planner::{self, MigrationPlan};
use crate::policy::DirectionPolicy;

/// SQL text that moves a schema from one version to another.
pub type Script = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Written for this specific pair of versions.
    Authored,
    /// The shared drop-everything script, synthesized for versions without
    /// an authored transition to the empty version.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub script: Script,
    pub kind: TransitionKind,
}

impl Transition {
    pub fn is_reset(&self) -> bool {
        self.kind == TransitionKind::Reset
    }
}

/// Known schema versions and the scripted transitions between them.
///
/// Every known version has an outgoing edge to the empty version: either an
/// explicit transition or the shared reset script.
#[derive(Debug, Clone)]
pub struct VersionGraph {
    versions: BTreeSet<Version>,
    transitions: BTreeMap<Version, BTreeMap<Version, Transition>>,
    latest: Version,
}

impl VersionGraph {
    pub fn build<V, T, S>(known: V, transitions: T, reset_script: impl Into<Script>) -> Self
    where
        V: IntoIterator<Item = Version>,
        T: IntoIterator<Item = ((Version, Version), S)>,
        S: Into<Script>,
    {
        let reset_script = reset_script.into();
        let mut versions: BTreeSet<Version> = known.into_iter().collect();
        versions.insert(EMPTY_VERSION);

        let mut edges: BTreeMap<Version, BTreeMap<Version, Transition>> = BTreeMap::new();
        for ((start, end), script) in transitions {
            versions.insert(start);
            versions.insert(end);
            edges.entry(start).or_default().insert(
                end,
                Transition {
                    script: script.into(),
                    kind: TransitionKind::Authored,
                },
            );
        }

        for version in &versions {
            edges
                .entry(*version)
                .or_default()
                .entry(EMPTY_VERSION)
                .or_insert_with(|| Transition {
                    script: Arc::clone(&reset_script),
                    kind: TransitionKind::Reset,
                });
        }

        let latest = versions.last().copied().unwrap_or(EMPTY_VERSION);
        debug!(
            "built version graph: {} versions, latest {latest}",
            versions.len()
        );

        Self {
            versions,
            transitions: edges,
            latest,
        }
    }

    pub fn from_catalog(catalog: TransitionCatalog) -> Self {
        let TransitionCatalog {
            versions,
            transitions,
            reset_script,
        } = catalog;
        Self::build(versions, transitions, reset_script)
    }

    pub fn empty_version(&self) -> Version {
        EMPTY_VERSION
    }

    pub fn latest_version(&self) -> Version {
        self.latest
    }

    pub fn contains(&self, version: Version) -> bool {
        self.versions.contains(&version)
    }

    pub fn versions(&self) -> impl Iterator<Item = Version> + '_ {
        self.versions.iter().copied()
    }

    /// The edge `from -> to`, including synthesized reset edges.
    pub fn transition(&self, from: Version, to: Version) -> Option<&Transition> {
        self.transitions.get(&from)?.get(&to)
    }

    pub(crate) fn outgoing(
        &self,
        from: Version,
    ) -> impl Iterator<Item = (Version, &Transition)> + '_ {
        self.transitions
            .get(&from)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(to, transition)| (*to, transition)))
    }

    pub fn plan_migration(
        &self,
        start: Version,
        end: Version,
        policy: DirectionPolicy,
    ) -> Result<MigrationPlan> {
        planner::plan(self, start, end, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_only() -> VersionGraph {
        VersionGraph::build(
            [],
            [((0, 1), "create a"), ((1, 2), "create b")],
            "drop all",
        )
    }

    #[test]
    fn endpoints_become_known_versions() {
        let graph = forward_only();
        assert_eq!(graph.versions().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(graph.latest_version(), 2);
        assert_eq!(graph.empty_version(), 0);
    }

    #[test]
    fn every_version_gets_reset_edge() {
        let graph = VersionGraph::build([7], [((0, 1), "up")], "drop all");
        for version in [0, 1, 7] {
            let transition = graph.transition(version, 0).unwrap();
            assert_eq!(&*transition.script, "drop all");
            assert!(transition.is_reset());
        }
    }

    #[test]
    fn explicit_downgrade_to_empty_overrides_reset() {
        let graph = VersionGraph::build([], [((0, 1), "up"), ((1, 0), "down")], "drop all");
        let down = graph.transition(1, 0).unwrap();
        assert_eq!(&*down.script, "down");
        assert_eq!(down.kind, TransitionKind::Authored);
        assert!(graph.transition(0, 0).unwrap().is_reset());
    }

    #[test]
    fn declared_versions_count_towards_latest() {
        let graph = VersionGraph::build([9], [((0, 1), "up")], "drop all");
        assert_eq!(graph.latest_version(), 9);
        assert!(graph.contains(9));
        assert!(!graph.contains(5));
    }

    #[test]
    fn empty_graph_knows_only_empty_version() {
        let graph = VersionGraph::build([], Vec::<((Version, Version), String)>::new(), "");
        assert_eq!(graph.versions().collect::<Vec<_>>(), vec![0]);
        assert_eq!(graph.latest_version(), 0);
    }
}
