use std::path::Path;

use anyhow::Context;
use classremap::{classfile::ClassFile, table::RenameTable};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{load_input, load_table},
    output::{print_output, Align, TabWriter},
};

#[derive(Debug, Serialize)]
struct ReferenceEntry {
    class: String,
    method: String,
    index: usize,
    instruction: String,
    target: String,
    renamed_to: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefsReport {
    classes: usize,
    references: usize,
    renamed: usize,
    entries: Vec<ReferenceEntry>,
}

pub fn run(
    input: &Path,
    table: Option<&Path>,
    renamed_only: bool,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    let table = match table {
        Some(path) => load_table(path)?,
        None => RenameTable::default(),
    };
    let loaded = load_input(input)?;

    let mut report = RefsReport {
        classes: loaded.classes.len(),
        references: 0,
        renamed: 0,
        entries: Vec::new(),
    };
    for class_input in &loaded.classes {
        let class = ClassFile::parse(&class_input.bytes)
            .with_context(|| format!("failed to parse {}", class_input.name))?;
        let class_name = class
            .constant_pool
            .class_entry(class.this_class)?
            .to_string_lossy()
            .into_owned();

        for (method, code) in class.code_bodies() {
            for (index, instruction) in code.instructions.iter().enumerate() {
                let Some(target) = instruction.referenced_class() else {
                    continue;
                };
                let renamed_to = table.get(target).filter(|new| *new != target);
                report.references += 1;
                if renamed_to.is_some() {
                    report.renamed += 1;
                } else if renamed_only {
                    continue;
                }
                report.entries.push(ReferenceEntry {
                    class: class_name.clone(),
                    method: format!("{}{}", method.name, method.descriptor),
                    index,
                    instruction: instruction.mnemonic().to_string(),
                    target: target.to_string(),
                    renamed_to: renamed_to.map(str::to_string),
                });
            }
        }
    }

    print_output(&report, global, |report| {
        let mut writer = TabWriter::new(&[
            ("CLASS", Align::Left),
            ("METHOD", Align::Left),
            ("#", Align::Right),
            ("INSN", Align::Left),
            ("REFERENCES", Align::Left),
            ("RENAMED TO", Align::Left),
        ]);
        for entry in &report.entries {
            writer.row(vec![
                entry.class.clone(),
                entry.method.clone(),
                entry.index.to_string(),
                entry.instruction.clone(),
                entry.target.clone(),
                entry.renamed_to.clone().unwrap_or_default(),
            ]);
        }
        if !writer.is_empty() {
            writer.print();
            println!();
        }
        eprintln!(
            "{} classes, {} references, {} would be rewritten",
            report.classes, report.references, report.renamed
        );
    })
}
