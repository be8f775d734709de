use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// classremap - rewrite class references in compiled JVM bytecode
#[derive(Debug, Parser)]
#[command(name = "classremap", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rewrite references to renamed classes in a class file, directory or jar.
    Rewrite {
        /// A .class file, a directory of class files, or a .jar/.zip archive.
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// JSON object mapping old internal class names to new ones.
        #[arg(short, long, value_name = "JSON")]
        table: PathBuf,

        /// Where to write the result (default: overwrite the input).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Only rewrite classes whose internal name starts with this prefix.
        #[arg(long, conflicts_with = "suffix")]
        prefix: Option<String>,

        /// Only rewrite classes whose internal name ends with this suffix.
        #[arg(long)]
        suffix: Option<String>,

        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Process classes one at a time instead of in parallel.
        #[arg(long)]
        sequential: bool,
    },

    /// List classes referenced from method bodies.
    Refs {
        /// A .class file, a directory of class files, or a .jar/.zip archive.
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Mark references that this rename table would rewrite.
        #[arg(short, long, value_name = "JSON")]
        table: Option<PathBuf>,

        /// Only list references the table renames. Requires --table.
        #[arg(long, requires = "table")]
        renamed_only: bool,
    },
}
