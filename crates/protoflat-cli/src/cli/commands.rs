//! Command builders for the CLI.
//!
//! Commands that decode messages share the limit flags. `decode-raw`
//! accepts them too, hidden, so scripts can pass one flag set to either.

use clap::Command;

use super::args::*;

/// Add hidden decode limit args (for commands that never build a message).
fn with_hidden_limit_args(cmd: Command) -> Command {
    cmd.arg(recursion_limit_arg().hide(true))
        .arg(max_bytes_arg().hide(true))
        .arg(utf8_arg().hide(true))
}

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("protoflat")
        .about("Inspect protocol buffer schemas and messages")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(check_command())
        .subcommand(symbols_command())
        .subcommand(decode_raw_command())
        .subcommand(roundtrip_command())
}

/// Validate a descriptor set.
pub fn check_command() -> Command {
    Command::new("check")
        .about("Validate a descriptor set")
        .override_usage("  protoflat check -d <FILE> [--strict]")
        .after_help(
            r#"EXAMPLES:
  protoc --descriptor_set_out=api.pb --include_imports api.proto
  protoflat check -d api.pb            # errors only
  protoflat check -d api.pb --strict   # warnings fail too"#,
        )
        .arg(descriptor_set_arg())
        .arg(strict_arg())
}

/// List every symbol defined by a descriptor set.
pub fn symbols_command() -> Command {
    Command::new("symbols")
        .about("List symbols defined by a descriptor set")
        .override_usage("  protoflat symbols -d <FILE> [--json]")
        .arg(descriptor_set_arg())
        .arg(json_arg())
}

/// Show encoded data as raw fields, without a schema.
pub fn decode_raw_command() -> Command {
    let cmd = Command::new("decode-raw")
        .about("Show encoded data as raw fields, without a schema")
        .override_usage("  protoflat decode-raw [INPUT]")
        .after_help(
            r#"EXAMPLES:
  protoflat decode-raw message.bin
  printf '\x08\x96\x01' | protoflat decode-raw"#,
        )
        .arg(input_arg());

    with_hidden_limit_args(cmd)
}

/// Decode a message with a schema and encode it again.
pub fn roundtrip_command() -> Command {
    Command::new("roundtrip")
        .about("Decode a message with a schema and encode it again")
        .override_usage("  protoflat roundtrip -d <FILE> -t <NAME> [INPUT]")
        .after_help(
            r#"EXAMPLES:
  protoflat roundtrip -d api.pb -t api.Request req.bin
  protoflat roundtrip -d api.pb -t api.Request req.bin --show
  protoflat roundtrip -d api.pb -t api.Request req.bin --deterministic -o out.bin"#,
        )
        .arg(descriptor_set_arg())
        .arg(message_type_arg())
        .arg(input_arg())
        .arg(output_file_arg())
        .arg(show_arg())
        .arg(deterministic_arg())
        .arg(recursion_limit_arg())
        .arg(max_bytes_arg())
        .arg(utf8_arg())
}
