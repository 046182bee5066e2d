//! Shared argument builders for CLI commands.
//!
//! Each function returns a `clap::Arg` so commands can compose the same
//! definition, hiding the ones they accept but ignore.

use std::path::PathBuf;

use clap::{Arg, ArgAction, value_parser};

/// Serialized `FileDescriptorSet` (-d/--descriptor-set).
pub fn descriptor_set_arg() -> Arg {
    Arg::new("descriptor_set")
        .short('d')
        .long("descriptor-set")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .required(true)
        .help("Serialized FileDescriptorSet (protoc --descriptor_set_out)")
}

/// Fully qualified message type (-t/--type).
pub fn message_type_arg() -> Arg {
    Arg::new("message_type")
        .short('t')
        .long("type")
        .value_name("NAME")
        .required(true)
        .help("Fully qualified message name, e.g. pkg.Message")
}

/// Encoded message input (positional).
pub fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("INPUT")
        .value_parser(value_parser!(PathBuf))
        .help("Encoded message file (\"-\" or omitted for stdin)")
}

/// Write output to file (-o/--output).
pub fn output_file_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Write re-encoded bytes to file")
}

/// Treat warnings as errors (--strict).
pub fn strict_arg() -> Arg {
    Arg::new("strict")
        .long("strict")
        .action(ArgAction::SetTrue)
        .help("Treat warnings as errors")
}

/// Machine-readable output (--json).
pub fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output JSON")
}

/// Maximum submessage nesting (--recursion-limit).
pub fn recursion_limit_arg() -> Arg {
    Arg::new("recursion_limit")
        .long("recursion-limit")
        .value_name("N")
        .default_value("100")
        .value_parser(value_parser!(u32))
        .help("Maximum submessage nesting")
}

/// Maximum input size (--max-bytes).
pub fn max_bytes_arg() -> Arg {
    Arg::new("max_bytes")
        .long("max-bytes")
        .value_name("N")
        .default_value("67108864")
        .value_parser(value_parser!(u64))
        .help("Maximum input size in bytes")
}

/// UTF-8 checking for string fields (--utf8).
pub fn utf8_arg() -> Arg {
    Arg::new("utf8")
        .long("utf8")
        .value_name("MODE")
        .value_parser(["off", "warn", "strict"])
        .help("UTF-8 checking for string fields (default: strict for proto3, warn for proto2)")
}

/// Sort map entries by key when encoding (--deterministic).
pub fn deterministic_arg() -> Arg {
    Arg::new("deterministic")
        .long("deterministic")
        .action(ArgAction::SetTrue)
        .help("Sort map entries by key when encoding")
}

/// Print the decoded message (--show).
pub fn show_arg() -> Arg {
    Arg::new("show")
        .long("show")
        .action(ArgAction::SetTrue)
        .help("Print the decoded message")
}
