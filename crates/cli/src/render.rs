//! Terminal and JSON output for loaded graphs

use console::style;
use navload_orm::{Node, Related, RoundTrip};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

/// What one demonstration did and what it cost
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub strategy: String,
    pub round_trips: usize,
    pub log: Vec<RoundTrip>,
    pub roots: Vec<JsonValue>,
}

impl ScenarioReport {
    pub fn new(scenario: &str, strategy: impl ToString, roots: &[Node], log: Vec<RoundTrip>) -> Self {
        Self {
            scenario: scenario.to_string(),
            strategy: strategy.to_string(),
            round_trips: log.len(),
            log,
            roots: roots.iter().map(Node::to_json).collect(),
        }
    }
}

pub fn heading(title: &str) {
    println!();
    println!("{}", style(format!("== {} ==", title)).cyan().bold());
}

pub fn note(text: &str) {
    println!("{}", style(text).dim());
}

/// Human label for a record: its title, author or name
pub fn label(node: &Node) -> String {
    let record = &node.record;
    let name = ["Title", "Author", "Name"]
        .iter()
        .find_map(|attribute| record.str_of(attribute))
        .unwrap_or_default();
    format!("{} {} {}", node.entity(), record.key, name).trim_end().to_string()
}

/// Print each node with its loaded relationships, indented per level
pub fn print_graph(nodes: &[Node]) {
    for node in nodes {
        print_node(node, 1);
    }
}

fn print_node(node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{}{}", indent, label(node));
    for (name, related) in node.relations() {
        if let Related::Loaded(children) = related {
            println!("{}  {} ({})", indent, style(name).yellow(), children.len());
            for child in children {
                print_node(child, depth + 2);
            }
        }
    }
}

pub fn print_trips(log: &[RoundTrip]) {
    println!("{}", style(format!("Round trips: {}", log.len())).green().bold());
    for trip in log {
        println!("  {}", style(trip).dim());
    }
}

/// Print a report as text or as one JSON document
pub fn report(output: Output, report: &ScenarioReport, nodes: &[Node]) -> anyhow::Result<()> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(report)?),
        Output::Text => {
            heading(&format!("{} ({})", report.scenario, report.strategy));
            print_graph(nodes);
            print_trips(&report.log);
        }
    }
    Ok(())
}
