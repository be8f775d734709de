mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // classremap info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("classremap", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Rewrite {
            input,
            table,
            output,
            prefix,
            suffix,
            dry_run,
            sequential,
        } => commands::rewrite::run(
            input,
            &commands::rewrite::RewriteOptions {
                table,
                output: output.as_deref(),
                prefix: prefix.as_deref(),
                suffix: suffix.as_deref(),
                dry_run: *dry_run,
                sequential: *sequential,
                global: &cli.global,
            },
        ),
        Command::Refs {
            input,
            table,
            renamed_only,
        } => commands::refs::run(input, table.as_deref(), *renamed_only, &cli.global),
    }
}
