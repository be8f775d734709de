use std::path::Path;

use anyhow::Context;
use classremap::{
    rewriter::{ClassFilter, ClassOutcome, RewriteConfig, RewriteStats},
    table::TableSource,
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{file_display_name, load_input},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct RewriteReport {
    input: String,
    output: Option<String>,
    table: String,
    renames: usize,
    dry_run: bool,
    scanned: usize,
    rewritten: usize,
    unchanged: usize,
    skipped: usize,
    written: usize,
    totals: RewriteStats,
    classes: Vec<ClassReport>,
}

#[derive(Debug, Serialize)]
struct ClassReport {
    name: String,
    #[serde(flatten)]
    stats: RewriteStats,
}

pub struct RewriteOptions<'a> {
    pub table: &'a Path,
    pub output: Option<&'a Path>,
    pub prefix: Option<&'a str>,
    pub suffix: Option<&'a str>,
    pub dry_run: bool,
    pub sequential: bool,
    pub global: &'a GlobalOptions,
}

pub fn run(input: &Path, opts: &RewriteOptions) -> anyhow::Result<()> {
    let filter = match (opts.prefix, opts.suffix) {
        (Some(prefix), _) => ClassFilter::Prefix(prefix.to_string()),
        (None, Some(suffix)) => ClassFilter::Suffix(suffix.to_string()),
        (None, None) => ClassFilter::All,
    };
    let mut config = RewriteConfig::new()
        .with_table(TableSource::File(opts.table.to_path_buf()))
        .with_filter(filter);
    if opts.sequential {
        config = config.sequential();
    }
    let session = config
        .open_session()
        .with_context(|| format!("failed to load rename table: {}", opts.table.display()))?;

    let mut loaded = load_input(input)?;
    if loaded.classes.is_empty() {
        log::warn!("No class files found in {}", input.display());
    }
    let scanned = loaded.classes.len();
    let outputs = session
        .rewrite_batch(std::mem::take(&mut loaded.classes))
        .with_context(|| format!("rewrite failed: {}", input.display()))?;

    let target = opts.output.unwrap_or(input);
    let written = if opts.dry_run {
        0
    } else {
        loaded.write(input, target, &outputs)?
    };

    let mut report = RewriteReport {
        input: input.display().to_string(),
        output: (!opts.dry_run).then(|| target.display().to_string()),
        table: opts.table.display().to_string(),
        renames: session.table().len(),
        dry_run: opts.dry_run,
        scanned,
        rewritten: 0,
        unchanged: 0,
        skipped: 0,
        written,
        totals: RewriteStats::default(),
        classes: Vec::new(),
    };
    for output in &outputs {
        match &output.outcome {
            ClassOutcome::Skipped(_) => report.skipped += 1,
            ClassOutcome::Unchanged(_) => report.unchanged += 1,
            ClassOutcome::Rewritten { stats, .. } => {
                report.rewritten += 1;
                report.totals += *stats;
                report.classes.push(ClassReport {
                    name: output.name.clone(),
                    stats: *stats,
                });
            }
        }
    }

    print_output(&report, opts.global, display_report)
}

fn display_report(report: &RewriteReport) {
    if !report.classes.is_empty() {
        let mut table = TabWriter::new(&[
            ("CLASS", Align::Left),
            ("METHODS", Align::Right),
            ("FIELDS", Align::Right),
            ("INVOKES", Align::Right),
            ("LDC", Align::Right),
        ]);
        for class in &report.classes {
            table.row(vec![
                class.name.clone(),
                class.stats.methods.to_string(),
                class.stats.field_refs.to_string(),
                class.stats.method_refs.to_string(),
                class.stats.type_constants.to_string(),
            ]);
        }
        table.print();
        println!();
    }

    let input = file_display_name(Path::new(&report.input));
    eprintln!(
        "{input}: {} classes scanned, {} rewritten, {} unchanged, {} skipped",
        report.scanned, report.rewritten, report.unchanged, report.skipped
    );
    eprintln!(
        "  References:  {} field, {} method, {} class literal ({} total)",
        report.totals.field_refs,
        report.totals.method_refs,
        report.totals.type_constants,
        report.totals.substitutions()
    );
    match &report.output {
        Some(output) => eprintln!("  Written:     {} class files to {output}", report.written),
        None => eprintln!("  Dry run, nothing written"),
    }
}
