//! Text renderings of a growth tree.
//!
//! Renderers only read [`GrowthTreeSnapshot`] values; they never touch a live
//! tree.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use structree_tree::{GrowthTreeSnapshot, NodeId};

use crate::driver::ScenarioReport;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Indented tree with one labelled line per node.
    #[default]
    Ascii,
    /// Graphviz digraph.
    Dot,
    /// Full scenario report as pretty JSON.
    Json,
    /// Per-structor progress table and final statistics.
    Summary,
}

pub fn render_report(report: &ScenarioReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Ascii => render_ascii(&report.snapshot),
        OutputFormat::Dot => render_dot(&report.snapshot),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            json
        }
        OutputFormat::Summary => render_summary(report),
    })
}

/// Indented tree, children in ID order:
///
/// ```text
/// #1: 39/11
/// ├── #2: 14/11
/// │   └── #5: 3/22
/// ├── #3: 17/22
/// └── #4: 3/11
/// ```
#[must_use]
pub fn render_ascii(snapshot: &GrowthTreeSnapshot) -> String {
    let mut out = String::new();
    let mut visited = BTreeSet::new();
    if let Some(root) = snapshot.node(snapshot.root) {
        let _ = writeln!(out, "{}", root.label);
        let _ = visited.insert(root.id);
        write_children(snapshot, root.id, "", &mut visited, &mut out);
    }
    out
}

fn write_children(
    snapshot: &GrowthTreeSnapshot,
    parent: NodeId,
    prefix: &str,
    visited: &mut BTreeSet<NodeId>,
    out: &mut String,
) {
    let children = snapshot.children_of(parent);
    let count = children.len();
    for (position, child) in children.into_iter().enumerate() {
        let Some(record) = snapshot.node(child) else {
            continue;
        };
        if !visited.insert(child) {
            continue;
        }
        let last = position + 1 == count;
        let (branch, extension) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let _ = writeln!(out, "{prefix}{branch}{}", record.label);
        write_children(
            snapshot,
            child,
            &format!("{prefix}{extension}"),
            visited,
            out,
        );
    }
}

/// Graphviz document: one labelled vertex per node, one edge per
/// parent/child pair.
#[must_use]
pub fn render_dot(snapshot: &GrowthTreeSnapshot) -> String {
    let mut nodes = snapshot.nodes.iter().collect::<Vec<_>>();
    nodes.sort_by_key(|node| node.id);

    let mut out = String::from("digraph growth_tree {\n    rankdir=TB;\n    node [shape=box];\n");
    for node in nodes {
        let _ = writeln!(
            out,
            "    n{} [label=\"{}\"];",
            node.id,
            escape_dot(&node.label)
        );
    }
    for (parent, child) in snapshot.edges() {
        let _ = writeln!(out, "    n{parent} -> n{child};");
    }
    out.push_str("}\n");
    out
}

fn escape_dot(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[must_use]
pub fn render_summary(report: &ScenarioReport) -> String {
    let scenario = &report.scenario;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "scenario: {} structor(s) x {} iteration(s) from rate {}",
        scenario.structors.len(),
        scenario.iterations,
        scenario.initial_rate
    );
    for step in &report.steps {
        let _ = writeln!(
            out,
            "  {:>3}.{:<3} {:<24} nodes={:<4} next_id={:<5} weight={}",
            step.iteration,
            step.index,
            step.structor.to_string(),
            step.nodes,
            step.next_id,
            step.total_weight
        );
    }
    let stats = &report.stats;
    let _ = writeln!(
        out,
        "final: nodes={} leaves={} max_depth={} rate={} weight={}",
        stats.nodes, stats.leaves, stats.max_depth, stats.rate, stats.total_weight
    );
    let _ = writeln!(
        out,
        "steps: total={} partial={} spawned={} pruned={} rate_changes={}",
        stats.counters.steps,
        stats.counters.partial_updates,
        stats.counters.spawned,
        stats.counters.pruned,
        stats.counters.rate_changes
    );
    let _ = writeln!(out, "checksum: {}", report.checksum);
    out
}

#[cfg(test)]
mod tests {
    use structree_core::Rational;
    use structree_tree::GrowthTree;

    use super::*;
    use crate::config::ScenarioConfig;
    use crate::driver::run_scenario;

    fn half_rate_snapshot() -> GrowthTreeSnapshot {
        let mut tree = GrowthTree::new(Rational::ONE).expect("tree");
        let half = Rational::new(1, 2).expect("rational");
        tree.evolve(half, Rational::from(6)).expect("evolve");
        tree.to_snapshot()
    }

    #[test]
    fn ascii_draws_nested_branches() {
        let expected = "\
#1: 39/11
├── #2: 14/11
│   └── #5: 3/22
├── #3: 17/22
└── #4: 3/11
";
        assert_eq!(render_ascii(&half_rate_snapshot()), expected);
    }

    #[test]
    fn ascii_of_bare_root_is_one_line() {
        let tree = GrowthTree::new(Rational::ONE).expect("tree");
        assert_eq!(render_ascii(&tree.to_snapshot()), "#1: 0\n");
    }

    #[test]
    fn dot_lists_vertices_then_edges() {
        let expected = "\
digraph growth_tree {
    rankdir=TB;
    node [shape=box];
    n1 [label=\"#1: 39/11\"];
    n2 [label=\"#2: 14/11\"];
    n3 [label=\"#3: 17/22\"];
    n4 [label=\"#4: 3/11\"];
    n5 [label=\"#5: 3/22\"];
    n1 -> n2;
    n1 -> n3;
    n1 -> n4;
    n2 -> n5;
}
";
        assert_eq!(render_dot(&half_rate_snapshot()), expected);
    }

    #[test]
    fn dot_escapes_quotes() {
        assert_eq!(escape_dot(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn summary_and_json_cover_the_report() {
        let report = run_scenario(&ScenarioConfig::demo()).expect("demo");

        let summary = render_report(&report, OutputFormat::Summary).expect("summary");
        assert!(summary.starts_with("scenario: 2 structor(s) x 4 iteration(s) from rate 1\n"));
        assert!(summary.contains("grow(1/2, 6)"));
        assert!(summary.contains("final: nodes=12"));
        assert!(summary.contains(&format!("checksum: {}", report.checksum)));

        let json = render_report(&report, OutputFormat::Json).expect("json");
        let back: ScenarioReport = serde_json::from_str(&json).expect("parse report");
        assert_eq!(back, report);
    }
}
