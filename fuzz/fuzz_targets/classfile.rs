#![no_main]

use classremap::{classfile::ClassFile, rewriter::rewrite, table::RenameTable};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(class) = ClassFile::parse(data) else {
        return;
    };
    let table: RenameTable = [("lib/R", "app/R"), ("java/lang/Object", "app/Base")]
        .into_iter()
        .collect();
    if let Ok(bytes) = rewrite(class, &table).to_bytes() {
        ClassFile::parse(&bytes).expect("written class must parse again");
    }
});
