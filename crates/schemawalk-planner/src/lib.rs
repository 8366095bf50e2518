//! Version graph, traversal policies and the shortest-path migration planner.

pub mod catalog;
pub mod graph;
pub mod planner;
pub mod policy;

pub use catalog::TransitionCatalog;
pub use graph::{Script, Transition, TransitionKind, VersionGraph};
pub use planner::{MigrationPlan, PlanStep, plan};
pub use policy::DirectionPolicy;
