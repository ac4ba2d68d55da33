use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use tracing::debug;
use vdelta::{
    Change, DiffReport, Engine, Kind, Patch, PropertyChange, PropertyChangeKind, Value,
};

use crate::cli::*;
use crate::config::resolve_options;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let (format, encoding) = (cli.format, cli.encoding);
    match cli.command {
        Command::Diff(args) => cmd_diff(args, format, encoding),
        Command::Delta(args) => cmd_delta(args, format, encoding),
        Command::Apply(args) => cmd_apply(args, format, encoding),
        Command::Hash(args) => cmd_hash(args, format, encoding),
    }
}

fn cmd_diff(args: DiffArgs, format: OutputFormat, encoding: Encoding) -> anyhow::Result<()> {
    let engine = Engine::with_options(resolve_options(&args.options)?);
    let old = load_value(&args.old, encoding)?;
    let new = load_value(&args.new, encoding)?;
    let patch = engine.diff(&old, &new)?;
    debug!(changes = patch.len(), "diff computed");

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&patch)?),
        OutputFormat::Text if patch.is_empty() => println!("No changes."),
        OutputFormat::Text => {
            for change in &patch {
                println!("{}", describe_change(change));
            }
            println!("\n{} changes", patch.len().to_string().bold());
        }
    }
    Ok(())
}

fn cmd_delta(args: DeltaArgs, format: OutputFormat, encoding: Encoding) -> anyhow::Result<()> {
    let engine = Engine::with_options(resolve_options(&args.options)?);
    let old = load_value(&args.old, encoding)?;
    let new = load_value(&args.new, encoding)?;
    let report = match selected_kind(args.kind) {
        Some(kind) => engine.delta_as(kind, &old, &new)?,
        None => engine.delta(&old, &new)?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn cmd_apply(args: ApplyArgs, format: OutputFormat, encoding: Encoding) -> anyhow::Result<()> {
    let base = load_value(&args.base, encoding)?;
    let patch = load_patch(&args.patch)?;
    let result = Engine::new().apply(&base, &patch)?;

    if let OutputFormat::Text = format {
        eprintln!("{} Applied {} changes", "✓".green().bold(), patch.len());
    }
    match encoding {
        Encoding::Arena => println!("{}", vdelta::to_text(&result)?),
        Encoding::Plain => {
            let json = result
                .to_json()
                .context("result is cyclic; use --encoding arena")?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

fn cmd_hash(args: HashArgs, format: OutputFormat, encoding: Encoding) -> anyhow::Result<()> {
    let (digest, domain) = if args.bytes {
        let bytes = std::fs::read(&args.file)
            .with_context(|| format!("reading {}", args.file.display()))?;
        (vdelta::hash_bytes(&bytes), vdelta::ValueHasher::BYTES.domain().to_string())
    } else {
        let value = load_value(&args.file, encoding)?;
        (vdelta::hash_of(&value)?, vdelta::ValueHasher::VALUE.domain().to_string())
    };

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "digest": digest.to_hex(), "domain": domain });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => println!("{}  {}", digest.to_hex().yellow(), args.file.display()),
    }
    Ok(())
}

// ---- Loading ----

pub(crate) fn load_value(path: &Path, encoding: Encoding) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value = match encoding {
        Encoding::Plain => {
            let json: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {} as JSON", path.display()))?;
            Value::from_json(&json)
        }
        Encoding::Arena => vdelta::from_text(&text)
            .with_context(|| format!("decoding {}", path.display()))?,
    };
    Ok(value)
}

pub(crate) fn load_patch(path: &Path) -> anyhow::Result<Patch> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing patch {}", path.display()))
}

fn selected_kind(kind: KindArg) -> Option<Kind> {
    match kind {
        KindArg::Auto => None,
        KindArg::Scalar => Some(Kind::Scalar),
        KindArg::Sequence => Some(Kind::Sequence),
        KindArg::Record => Some(Kind::Record),
        KindArg::Unordered => Some(Kind::Unordered),
        KindArg::Associative => Some(Kind::Associative),
    }
}

// ---- Rendering ----

/// Compact one-line rendering. Cyclic values cannot be shown as JSON.
fn render(value: &Value) -> String {
    match value.to_json() {
        Ok(json) => json.to_string(),
        Err(_) => format!("<cyclic {}>", value.kind().map(|k| k.name()).unwrap_or("value")),
    }
}

fn describe_change(change: &Change) -> String {
    let path = change.path().to_string();
    match change {
        Change::Create { new_value, .. } => {
            format!("{} {}: {}", "+".green().bold(), path, render(new_value).green())
        }
        Change::Update {
            old_value,
            new_value,
            ..
        } => format!(
            "{} {}: {} -> {}",
            "~".yellow().bold(),
            path,
            render(old_value).red(),
            render(new_value).green()
        ),
        Change::Delete { old_value, .. } => {
            format!("{} {}: {}", "-".red().bold(), path, render(old_value).red())
        }
    }
}

fn describe_property(key: &str, change: &PropertyChange) -> String {
    let show = |v: &Option<Value>| v.as_ref().map(render).unwrap_or_default();
    match change.kind {
        PropertyChangeKind::Added => {
            format!("  {} {} {}", "added".green(), key.bold(), show(&change.new_value))
        }
        PropertyChangeKind::Removed => {
            format!("  {} {} {}", "removed".red(), key.bold(), show(&change.old_value))
        }
        PropertyChangeKind::Modified => format!(
            "  {} {} {} -> {}",
            "modified".yellow(),
            key.bold(),
            show(&change.old_value),
            show(&change.new_value)
        ),
        PropertyChangeKind::Unchanged => format!("  {} {}", "unchanged".dimmed(), key.bold()),
    }
}

fn print_report(report: &DiffReport) {
    let delta = &report.delta;
    for (key, change) in &delta.changes {
        println!("{}", describe_property(key.as_str(), change));
    }
    println!(
        "{} total ({} added, {} removed, {} modified), {} pairs compared in {:?}",
        delta.total.to_string().bold(),
        delta.added.to_string().green(),
        delta.removed.to_string().red(),
        delta.modified.to_string().yellow(),
        report.compared_count,
        report.elapsed
    );
}
