//! Tests for CLI dispatch logic.
//!
//! These tests verify:
//! 1. Hidden flags: decode-raw accepts the roundtrip limit flags
//! 2. Help visibility: hidden flags don't appear in --help
//! 3. Params extraction: correct fields are extracted from ArgMatches

use std::path::PathBuf;

use protoflat::Utf8Mode;

use super::*;
use crate::cli::commands::{check_command, decode_raw_command, roundtrip_command, symbols_command};
use crate::commands::roundtrip::RoundtripArgs;

#[test]
fn decode_raw_accepts_limit_flags() {
    let cmd = decode_raw_command();
    let result = cmd.try_get_matches_from([
        "decode-raw",
        "msg.bin",
        "--recursion-limit",
        "5",
        "--max-bytes",
        "1024",
        "--utf8",
        "warn",
    ]);
    assert!(
        result.is_ok(),
        "decode-raw should accept limit flags: {:?}",
        result.err()
    );

    let m = result.unwrap();
    let params = DecodeRawParams::from_matches(&m);
    assert_eq!(params.input, Some(PathBuf::from("msg.bin")));
}

#[test]
fn decode_raw_help_hides_limit_flags() {
    let mut cmd = decode_raw_command();
    let help = cmd.render_help().to_string();

    assert!(!help.contains("--recursion-limit"));
    assert!(!help.contains("--max-bytes"));
    assert!(!help.contains("--utf8"));
}

#[test]
fn roundtrip_help_shows_limit_flags() {
    let mut cmd = roundtrip_command();
    let help = cmd.render_help().to_string();

    assert!(help.contains("--recursion-limit"));
    assert!(help.contains("--max-bytes"));
    assert!(help.contains("--utf8"));
}

#[test]
fn roundtrip_params_extraction() {
    let cmd = roundtrip_command();
    let m = cmd
        .try_get_matches_from([
            "roundtrip",
            "-d",
            "api.pb",
            "-t",
            "api.Request",
            "req.bin",
            "-o",
            "out.bin",
            "--deterministic",
            "--recursion-limit",
            "8",
            "--utf8",
            "off",
        ])
        .unwrap();
    let params = RoundtripParams::from_matches(&m);

    assert_eq!(params.descriptor_set, PathBuf::from("api.pb"));
    assert_eq!(params.message_type, "api.Request");
    assert_eq!(params.input, Some(PathBuf::from("req.bin")));
    assert_eq!(params.output, Some(PathBuf::from("out.bin")));
    assert!(params.deterministic);
    assert!(!params.show);
    assert_eq!(params.recursion_limit, 8);
    assert_eq!(params.max_bytes, 64 << 20);
    assert_eq!(params.utf8, Some(Utf8Mode::Off));
}

#[test]
fn roundtrip_args_carry_options() {
    let cmd = roundtrip_command();
    let m = cmd
        .try_get_matches_from([
            "roundtrip",
            "-d",
            "api.pb",
            "-t",
            "api.Request",
            "--deterministic",
            "--recursion-limit",
            "8",
            "--max-bytes",
            "512",
        ])
        .unwrap();
    let args: RoundtripArgs = RoundtripParams::from_matches(&m).into();

    assert_eq!(args.input, None);
    assert_eq!(args.decode.get_recursion_limit(), 8);
    assert_eq!(args.decode.get_total_bytes_limit(), 512);
    assert_eq!(args.decode.get_utf8_mode(), None);
    assert!(args.encode.get_deterministic());
    assert_eq!(args.encode.get_recursion_limit(), 8);
}

#[test]
fn roundtrip_requires_type() {
    let cmd = roundtrip_command();
    let result = cmd.try_get_matches_from(["roundtrip", "-d", "api.pb", "req.bin"]);
    assert!(result.is_err());
}

#[test]
fn roundtrip_rejects_unknown_utf8_mode() {
    let cmd = roundtrip_command();
    let result = cmd.try_get_matches_from([
        "roundtrip", "-d", "api.pb", "-t", "api.Request", "--utf8", "lenient",
    ]);
    assert!(result.is_err());
}

#[test]
fn check_requires_descriptor_set() {
    let cmd = check_command();
    let result = cmd.try_get_matches_from(["check", "--strict"]);
    assert!(result.is_err());
}

#[test]
fn check_params_extraction() {
    let cmd = check_command();
    let m = cmd
        .try_get_matches_from(["check", "--descriptor-set", "api.pb", "--strict"])
        .unwrap();
    let params = CheckParams::from_matches(&m);

    assert_eq!(params.descriptor_set, PathBuf::from("api.pb"));
    assert!(params.strict);
}

#[test]
fn symbols_params_extraction() {
    let cmd = symbols_command();
    let m = cmd
        .try_get_matches_from(["symbols", "-d", "api.pb", "--json"])
        .unwrap();
    let params = SymbolsParams::from_matches(&m);

    assert_eq!(params.descriptor_set, PathBuf::from("api.pb"));
    assert!(params.json);
}

#[test]
fn cli_requires_subcommand() {
    let cmd = build_cli();
    let result = cmd.try_get_matches_from(["protoflat"]);
    assert!(result.is_err());
}
