//! Scenario driver: build a tree and run structors through it.

use serde::{Deserialize, Serialize};
use structree_core::Rational;
use structree_tree::{GrowthError, GrowthStats, GrowthTree, GrowthTreeSnapshot, Structor};
use tracing::{debug, info, info_span};

use crate::config::ScenarioConfig;
use crate::error::{HarnessError, Result};
use crate::golden::snapshot_checksum;

/// Tree state after one structor application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based loop number.
    pub iteration: u32,
    /// 1-based position within the structor list.
    pub index: usize,
    pub structor: Structor,
    pub nodes: usize,
    pub next_id: u64,
    pub total_weight: Rational,
    pub state_hash: u64,
}

/// Everything a scenario run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: ScenarioConfig,
    pub steps: Vec<StepRecord>,
    pub stats: GrowthStats,
    pub snapshot: GrowthTreeSnapshot,
    pub checksum: String,
}

/// Apply `structors` in order, `iterations` times, to a fresh tree.
pub fn evolve_loop(
    initial_rate: Rational,
    structors: &[Structor],
    iterations: u32,
) -> std::result::Result<GrowthTree, GrowthError> {
    let mut tree = GrowthTree::new(initial_rate)?;
    for _ in 0..iterations {
        tree.apply_all(structors)?;
    }
    Ok(tree)
}

/// Run a validated scenario, recording the tree after every structor.
pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioReport> {
    config.validate()?;
    let _span = info_span!(
        "scenario.run",
        initial_rate = %config.initial_rate,
        iterations = config.iterations,
        structors = config.structors.len()
    )
    .entered();

    let mut tree = GrowthTree::new(config.initial_rate)
        .map_err(|source| HarnessError::growth("tree construction", source))?;
    let mut steps = Vec::with_capacity(config.applications());

    for iteration in 1..=config.iterations {
        for (offset, structor) in config.structors.iter().enumerate() {
            let index = offset + 1;
            tree.apply(structor).map_err(|source| {
                HarnessError::growth(
                    format!("structor {index} {structor} of iteration {iteration}"),
                    source,
                )
            })?;
            let record = StepRecord {
                iteration,
                index,
                structor: structor.clone(),
                nodes: tree.node_count(),
                next_id: tree.next_id().get(),
                total_weight: tree
                    .total_weight()
                    .map_err(|source| HarnessError::growth("weight summary", source))?,
                state_hash: tree.state_hash(),
            };
            debug!(
                iteration,
                index,
                nodes = record.nodes,
                total_weight = %record.total_weight,
                "applied structor"
            );
            steps.push(record);
        }
    }

    let stats = tree
        .stats()
        .map_err(|source| HarnessError::growth("final statistics", source))?;
    let snapshot = tree.to_snapshot();
    let checksum = snapshot_checksum(&snapshot)?;
    info!(
        nodes = stats.nodes,
        steps = stats.counters.steps,
        %checksum,
        "scenario complete"
    );

    Ok(ScenarioReport {
        scenario: config.clone(),
        steps,
        stats,
        snapshot,
        checksum,
    })
}
