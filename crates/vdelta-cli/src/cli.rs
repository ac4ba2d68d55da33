use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vdelta",
    about = "Structural diff and patch for JSON documents",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// How input documents are encoded on disk.
    #[arg(long, global = true, default_value = "plain")]
    pub encoding: Encoding,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Encoding {
    /// Ordinary JSON documents.
    Plain,
    /// Lossless arena text, as written by `--encoding arena` output.
    Arena,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the change list turning OLD into NEW
    Diff(DiffArgs),
    /// Print a per-kind summary of the changes between OLD and NEW
    Delta(DeltaArgs),
    /// Apply a patch file to BASE and print the result
    Apply(ApplyArgs),
    /// Print the content digest of a document
    Hash(HashArgs),
}

/// Flags shared by every command that runs the differ.
#[derive(Args, Clone, Debug, Default)]
pub struct OptionArgs {
    /// Compare sequences as multisets
    #[arg(long)]
    pub order_insensitive: bool,
    /// Skip this field name at any depth (repeatable)
    #[arg(long = "ignore-key", value_name = "KEY")]
    pub ignore_keys: Vec<String>,
    /// Reject cyclic inputs instead of short-circuiting them
    #[arg(long)]
    pub no_cycles_fix: bool,
    /// TOML file with a [diff] table; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args)]
pub struct DeltaArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    #[arg(long, default_value = "auto")]
    pub kind: KindArg,
    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum KindArg {
    Auto,
    Scalar,
    Sequence,
    Record,
    Unordered,
    Associative,
}

#[derive(Args)]
pub struct ApplyArgs {
    pub base: PathBuf,
    /// JSON text of a change list, as printed by `diff --format json`
    pub patch: PathBuf,
}

#[derive(Args)]
pub struct HashArgs {
    pub file: PathBuf,
    /// Hash the raw file bytes instead of the parsed value
    #[arg(long)]
    pub bytes: bool,
}
