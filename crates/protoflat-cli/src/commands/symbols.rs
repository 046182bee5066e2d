use std::fmt::Write as _;
use std::path::PathBuf;

use protoflat::DescriptorPool;
use serde::Serialize;

use super::input::load_pool;

pub struct SymbolsArgs {
    pub descriptor_set: PathBuf,
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct SymbolEntry<'a> {
    pub name: &'a str,
    pub kind: &'static str,
    pub file: &'a str,
}

pub fn run(args: SymbolsArgs) {
    let pool = match load_pool(&args.descriptor_set) {
        Ok(pool) => pool,
        Err(msg) => {
            eprint!("{}", msg);
            std::process::exit(1);
        }
    };

    let entries = collect_symbols(&pool);

    if !args.json {
        print!("{}", render_text(&entries));
        return;
    }

    match serde_json::to_string_pretty(&entries) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Every symbol of the pool, sorted by full name.
pub fn collect_symbols(pool: &DescriptorPool) -> Vec<SymbolEntry<'_>> {
    let mut entries: Vec<_> = pool
        .symbol_names()
        .map(|name| SymbolEntry {
            name,
            kind: symbol_kind(pool, name),
            file: pool
                .find_file_containing_symbol(name)
                .map(|f| f.name())
                .unwrap_or_default(),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(b.name));
    entries
}

/// One `kind  name` line per symbol, kinds padded to a column.
pub fn render_text(entries: &[SymbolEntry<'_>]) -> String {
    let width = entries.iter().map(|e| e.kind.len()).max().unwrap_or(0);
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{:<width$}  {}", entry.kind, entry.name);
    }
    out
}

fn symbol_kind(pool: &DescriptorPool, name: &str) -> &'static str {
    if pool.find_message_by_name(name).is_some() {
        "message"
    } else if pool.find_enum_by_name(name).is_some() {
        "enum"
    } else if pool.find_enum_value_by_name(name).is_some() {
        "enum value"
    } else if pool.find_extension_by_name(name).is_some() {
        "extension"
    } else if pool.find_field_by_name(name).is_some() {
        "field"
    } else if pool.find_oneof_by_name(name).is_some() {
        "oneof"
    } else if pool.find_service_by_name(name).is_some() {
        "service"
    } else if pool.find_method_by_name(name).is_some() {
        "method"
    } else {
        "package"
    }
}
