//! calc-tree CLI - cell resolution and what-if tool

use anyhow::{Context, Result};
use calc_tree::prelude::*;
use calc_tree::{
    resolve_csv, tokenize, CellPanel, NoCells, PanelKind, Parser as FormulaParser, TextCells,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "calc-tree")]
#[command(
    author,
    version,
    about = "Resolve a spreadsheet cell into its calculation tree and recalculate it"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of a cell content string
    Tokens {
        /// Cell content, e.g. "=SUM(1, B2)" or "42"
        #[arg(allow_hyphen_values = true)]
        content: String,
    },

    /// Evaluate a formula or literal with no cells available
    Eval {
        /// Cell content, e.g. "=ROUND(10 / 3, 2)"
        #[arg(allow_hyphen_values = true)]
        content: String,

        /// What a reference to an unknown cell becomes
        #[arg(long, value_enum, default_value_t = Missing::Zero)]
        missing: Missing,
    },

    /// Resolve a cell of a CSV grid and show its calculation tree
    Resolve {
        /// Input CSV file
        csv: PathBuf,

        /// Target cell address, e.g. C1
        target: String,

        /// Override an input cell (repeatable)
        #[arg(long = "set", value_name = "ADDR=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, f64)>,

        /// What a reference to an unknown cell becomes
        #[arg(long, value_enum, default_value_t = Missing::Zero)]
        missing: Missing,

        /// Maximum nesting of groups, calls, references and operator levels
        #[arg(long, default_value_t = 256)]
        max_depth: usize,

        /// Parse a cell again at every reference instead of sharing its subtree
        #[arg(long)]
        no_share: bool,

        /// Leave out text fields instead of failing on them
        #[arg(long)]
        skip_text: bool,

        /// The first CSV row is a header
        #[arg(long)]
        has_header: bool,

        /// Field delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Print a JSON report
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Missing {
    /// Treat unknown cells as 0
    Zero,
    /// Fail on unknown cells
    Error,
}

impl From<Missing> for MissingReference {
    fn from(missing: Missing) -> Self {
        match missing {
            Missing::Zero => MissingReference::Zero,
            Missing::Error => MissingReference::Error,
        }
    }
}

/// JSON report for `resolve`
#[derive(Serialize)]
struct Report {
    target: String,
    baseline: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    overrides: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recalculated: Option<f64>,
    cells: Vec<PanelReport>,
}

#[derive(Serialize)]
struct PanelReport {
    address: String,
    depth: usize,
    kind: &'static str,
    baseline: Option<f64>,
    value: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<PanelReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tokens { content } => show_tokens(&content),
        Commands::Eval { content, missing } => eval(&content, missing),
        Commands::Resolve {
            csv,
            target,
            set,
            missing,
            max_depth,
            no_share,
            skip_text,
            has_header,
            delimiter,
            json,
        } => {
            let csv_options = CsvReadOptions {
                delimiter: u8::try_from(delimiter).context("Delimiter must be a single byte")?,
                has_header,
                text_cells: if skip_text {
                    TextCells::Skip
                } else {
                    TextCells::Reject
                },
                ..Default::default()
            };
            let options = ResolveOptions {
                parser: ParserOptions {
                    max_depth,
                    missing_reference: missing.into(),
                    share_references: !no_share,
                },
            };
            resolve(&csv, &target, &set, &csv_options, &options, json)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse `ADDR=VALUE`
fn parse_assignment(s: &str) -> std::result::Result<(String, f64), String> {
    let (address, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got '{}'", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((address.trim().to_string(), value))
}

fn show_tokens(content: &str) -> Result<()> {
    let tokens = tokenize(content).with_context(|| format!("Failed to tokenize '{}'", content))?;
    let rendered: Vec<String> = tokens.iter().map(ToString::to_string).collect();
    println!("{}", rendered.join(" "));
    Ok(())
}

fn eval(content: &str, missing: Missing) -> Result<()> {
    let options = ParserOptions {
        missing_reference: missing.into(),
        ..Default::default()
    };
    let tree = FormulaParser::new(&NoCells)
        .with_options(options)
        .parse_content(content)
        .with_context(|| format!("Failed to parse '{}'", content))?;
    let value = tree.evaluate_baseline().context("Failed to evaluate")?;
    println!("{}", value);
    Ok(())
}

fn resolve(
    csv: &Path,
    target: &str,
    set: &[(String, f64)],
    csv_options: &CsvReadOptions,
    options: &ResolveOptions,
    json: bool,
) -> Result<()> {
    let (cells, resolved) = resolve_csv(csv, target, csv_options, options)
        .with_context(|| format!("Failed to resolve {} in '{}'", target, csv.display()))?;
    info!(cells = cells.len(), baseline = resolved.baseline, "resolved");

    let mut session = WhatIfSession::new(resolved);
    for (address, value) in set {
        if !session.inputs().contains(address) {
            warn!(address = address.as_str(), "override does not match any input cell, ignored");
            continue;
        }
        session.set_override(address, *value);
    }

    let recalculated = if set.is_empty() {
        None
    } else {
        Some(session.recalculate().context("Recalculation failed")?)
    };

    let panels = session.cell().outline();

    if json {
        let report = Report {
            target: session.cell().target.clone(),
            baseline: session.cell().baseline,
            overrides: session
                .overrides()
                .iter()
                .map(|(a, v)| (a.clone(), *v))
                .collect(),
            recalculated,
            cells: panels.iter().map(|p| panel_report(p, &session)).collect(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
        return Ok(());
    }

    for panel in &panels {
        print_panel(panel, &session, recalculated.is_some());
    }
    println!();
    println!("Baseline: {}", session.cell().baseline);
    if let Some(value) = recalculated {
        println!("Recalculated: {}", value);
    }
    Ok(())
}

fn panel_baseline(panel: &CellPanel) -> Option<f64> {
    match panel.kind {
        PanelKind::Input { stored } => stored,
        PanelKind::Formula { baseline } => baseline,
    }
}

fn panel_report(panel: &CellPanel, session: &WhatIfSession) -> PanelReport {
    PanelReport {
        address: panel.address.clone(),
        depth: panel.depth,
        kind: match panel.kind {
            PanelKind::Input { .. } => "input",
            PanelKind::Formula { .. } => "formula",
        },
        baseline: panel_baseline(panel),
        value: session.display_value(&panel.address),
        children: panel
            .children
            .iter()
            .map(|c| panel_report(c, session))
            .collect(),
    }
}

fn print_panel(panel: &CellPanel, session: &WhatIfSession, show_changes: bool) {
    let indent = "  ".repeat(panel.depth.saturating_sub(1));
    let label = match panel.kind {
        PanelKind::Input { .. } => "input",
        PanelKind::Formula { .. } => "formula",
    };
    let baseline = format_value(panel_baseline(panel));
    let current = format_value(session.display_value(&panel.address));

    if show_changes && current != baseline {
        println!("{}{} [{}] {} -> {}", indent, panel.address, label, baseline, current);
    } else {
        println!("{}{} [{}] {}", indent, panel.address, label, baseline);
    }
    for child in &panel.children {
        print_panel(child, session, show_changes);
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}
