use std::str::FromStr;

use anyhow::{Context, Result};
use schemawalk_common::{EMPTY_VERSION, Version};
use schemawalk_config::AppConfig;
use schemawalk_db::{MigrationExecutor, ViewVersionStore};
use schemawalk_planner::{DirectionPolicy, MigrationPlan, TransitionCatalog, VersionGraph};
use tracing::info;

/// A migration target given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Latest,
    Empty,
    Version(Version),
}

impl Target {
    pub fn resolve(self, graph: &VersionGraph) -> Version {
        match self {
            Target::Latest => graph.latest_version(),
            Target::Empty => graph.empty_version(),
            Target::Version(v) => v,
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(Target::Latest),
            "empty" => Ok(Target::Empty),
            other => other
                .parse()
                .map(Target::Version)
                .map_err(|_| format!("expected a version number, `latest` or `empty`, got `{other}`")),
        }
    }
}

/// Upgrade towards higher versions, downgrade otherwise.
pub fn default_policy(start: Version, end: Version) -> DirectionPolicy {
    if end > start {
        DirectionPolicy::upgrade()
    } else {
        DirectionPolicy::downgrade()
    }
}

pub fn status(config: &AppConfig) -> Result<()> {
    let executor = open_executor(config)?;
    match executor.read_version()? {
        Some(meta) => println!("{}", meta.to_json()?),
        None => println!("unversioned"),
    }
    Ok(())
}

pub fn latest(config: &AppConfig) -> Result<()> {
    let graph = load_graph(config)?;
    println!("{}", graph.latest_version());
    Ok(())
}

pub fn plan(
    config: &AppConfig,
    from: Version,
    to: Target,
    policy: Option<DirectionPolicy>,
) -> Result<()> {
    let graph = load_graph(config)?;
    let end = to.resolve(&graph);
    let policy = policy.unwrap_or_else(|| default_policy(from, end));
    let plan = graph
        .plan_migration(from, end, policy)
        .with_context(|| format!("no {policy} migration from {from} to {end}"))?;
    print_plan(&plan);
    Ok(())
}

pub fn migrate(
    config: &AppConfig,
    to: Target,
    policy: Option<DirectionPolicy>,
    dry_run: bool,
) -> Result<()> {
    let graph = load_graph(config)?;
    let executor = open_executor(config)?;

    let current = executor
        .read_version()?
        .map_or(EMPTY_VERSION, |meta| meta.version);
    let end = to.resolve(&graph);
    let policy = policy.unwrap_or_else(|| default_policy(current, end));
    let plan = graph
        .plan_migration(current, end, policy)
        .with_context(|| format!("no {policy} migration from {current} to {end}"))?;

    if plan.is_empty() {
        println!("already at version {current}");
        return Ok(());
    }
    print_plan(&plan);
    if dry_run {
        return Ok(());
    }

    executor
        .execute(&plan)
        .with_context(|| format!("migration {plan} failed"))?;
    info!("database at {} migrated to version {end}", config.database.path.display());
    println!("migrated to version {end}");
    Ok(())
}

fn load_graph(config: &AppConfig) -> Result<VersionGraph> {
    let catalog = TransitionCatalog::from_parts(
        &config.catalog.reset_script_path(),
        &config.catalog.transitions_path(),
    )
    .context("failed to load transition catalog")?;
    Ok(VersionGraph::from_catalog(catalog))
}

fn open_executor(config: &AppConfig) -> Result<MigrationExecutor> {
    let store = ViewVersionStore::new(config.database.meta_view.clone());
    MigrationExecutor::open_with_store(&config.database.path, store)
        .with_context(|| format!("failed to open {}", config.database.path.display()))
}

fn print_plan(plan: &MigrationPlan) {
    println!("{plan}");
    let mut start = plan.start();
    for step in plan.steps() {
        println!("  {start} -> {}", step.end);
        start = step.end;
    }
}
