//! Inspection helper for dumped and rotated log trees.
//!
//! Reads the JSON documents written by the tree logger and prints per-path summaries, filtered
//! records, or the rotation history kept next to a primary file.
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use logtree::{Level, tree::LOGS_KEY};
use serde_json::{Map, Value};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "logtree-inspect", about = "Inspect JSON log trees and their rotations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count records per path and per level.
    Summary {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print matching records as JSON lines.
    Grep {
        #[arg(long)]
        input: PathBuf,
        /// Keep records at least as severe as this level.
        #[arg(long, value_parser = parse_level)]
        level: Option<Level>,
        /// Dotted path prefix, e.g. `foo.bar`.
        #[arg(long)]
        path: Option<String>,
    },
    /// List rotated files for a primary file name, oldest first.
    History {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, default_value = "log.json")]
        base: String,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Summary { input } => summary(&input),
        Command::Grep { input, level, path } => grep(&input, level, path.as_deref()),
        Command::History { dir, base } => history(&dir, &base),
    }
}

fn parse_level(value: &str) -> Result<Level, String> {
    value
        .parse()
        .map_err(|()| format!("unknown level '{value}'"))
}

struct NodeRecords<'a> {
    path: String,
    records: &'a [Value],
}

fn load_tree(input: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read log tree at {}", input.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse log tree at {}", input.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("log tree at {} is not a JSON object", input.display()),
    }
}

fn collect_records<'a>(node: &'a Map<String, Value>, prefix: &str, out: &mut Vec<NodeRecords<'a>>) {
    for (key, value) in node {
        if key == LOGS_KEY {
            if let Some(records) = value.as_array() {
                out.push(NodeRecords {
                    path: prefix.to_string(),
                    records,
                });
            }
            continue;
        }
        if let Some(child) = value.as_object() {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            collect_records(child, &path, out);
        }
    }
}

fn record_level(record: &Value) -> Option<Level> {
    record
        .get("LogLevel")
        .and_then(Value::as_str)
        .and_then(|name| name.parse().ok())
}

/// Record totals for one node path.
#[derive(Debug, PartialEq, Eq)]
struct PathSummary {
    path: String,
    total: usize,
    per_level: BTreeMap<Level, usize>,
}

fn summarize(tree: &Map<String, Value>) -> Vec<PathSummary> {
    let mut nodes = Vec::new();
    collect_records(tree, "", &mut nodes);
    nodes
        .into_iter()
        .map(|node| {
            let mut per_level = BTreeMap::new();
            for level in node.records.iter().filter_map(record_level) {
                *per_level.entry(level).or_default() += 1;
            }
            PathSummary {
                path: node.path,
                total: node.records.len(),
                per_level,
            }
        })
        .collect()
}

fn summary(input: &Path) -> Result<()> {
    let tree = load_tree(input)?;
    let summaries = summarize(&tree);
    for entry in &summaries {
        let levels = entry
            .per_level
            .iter()
            .map(|(level, count)| format!("{level}={count}"))
            .collect::<Vec<_>>()
            .join(" ");
        let path = if entry.path.is_empty() { "(root)" } else { entry.path.as_str() };
        println!("{path}\t{}\t{levels}", entry.total);
    }
    let total: usize = summaries.iter().map(|entry| entry.total).sum();
    println!("total\t{total}");
    Ok(())
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Records matching the filters, each tagged with its dotted `Path`.
fn matching_records(
    tree: &Map<String, Value>,
    level: Option<Level>,
    prefix: Option<&str>,
) -> Vec<Value> {
    let mut nodes = Vec::new();
    collect_records(tree, "", &mut nodes);

    let mut matches = Vec::new();
    for node in nodes {
        if prefix.is_some_and(|prefix| !under_prefix(&node.path, prefix)) {
            continue;
        }
        for record in node.records {
            let severe_enough = match (level, record_level(record)) {
                (Some(threshold), Some(actual)) => actual <= threshold,
                (Some(_), None) => false,
                (None, _) => true,
            };
            if !severe_enough {
                continue;
            }
            let mut line = Map::new();
            line.insert("Path".into(), Value::String(node.path.clone()));
            if let Some(fields) = record.as_object() {
                line.extend(fields.clone());
            }
            matches.push(Value::Object(line));
        }
    }
    matches
}

fn grep(input: &Path, level: Option<Level>, prefix: Option<&str>) -> Result<()> {
    let tree = load_tree(input)?;
    for line in matching_records(&tree, level, prefix) {
        println!("{line}");
    }
    Ok(())
}

/// Parse `{hour}_{minute}_{second}_{nanos}_{base}` into a sortable key.
fn rotation_key(file_name: &str, base: &str) -> Option<(u32, u32, u32, u64)> {
    let stamp = file_name.strip_suffix(base)?.strip_suffix('_')?;
    let mut fields = stamp.split('_');
    let key = (
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
    );
    if fields.next().is_some() {
        return None;
    }
    Some(key)
}

/// Rotated files for `base` in `dir`, oldest first, with their record counts.
fn rotation_history(dir: &Path, base: &str) -> Result<Vec<(PathBuf, usize)>> {
    let mut rotated = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(key) = rotation_key(&name, base) {
            rotated.push((key, entry.into_path()));
        }
    }
    rotated.sort();

    rotated
        .into_iter()
        .map(|(_, path)| {
            let tree = load_tree(&path)
                .with_context(|| format!("failed to inspect {}", path.display()))?;
            let count: usize = summarize(&tree).iter().map(|entry| entry.total).sum();
            Ok::<_, anyhow::Error>((path, count))
        })
        .collect()
}

fn history(dir: &Path, base: &str) -> Result<()> {
    for (path, count) in rotation_history(dir, base)? {
        println!("{}\t{count}", path.display());
    }
    Ok(())
}
