//! Dispatch logic: extract params from ArgMatches and convert to command args.
//!
//! - `*Params` structs are populated from clap, ignoring hidden flags
//! - `Into<*Args>` impls bridge dispatch to the command handlers
//! - limit flags become `DecodeOptions`/`EncodeOptions`

use std::path::PathBuf;

use clap::ArgMatches;
use protoflat::{DecodeOptions, EncodeOptions, Utf8Mode};

use crate::commands::check::CheckArgs;
use crate::commands::decode_raw::DecodeRawArgs;
use crate::commands::roundtrip::RoundtripArgs;
use crate::commands::symbols::SymbolsArgs;

pub struct CheckParams {
    pub descriptor_set: PathBuf,
    pub strict: bool,
}

impl CheckParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            descriptor_set: descriptor_set(m),
            strict: m.get_flag("strict"),
        }
    }
}

impl From<CheckParams> for CheckArgs {
    fn from(p: CheckParams) -> Self {
        Self {
            descriptor_set: p.descriptor_set,
            strict: p.strict,
        }
    }
}

pub struct SymbolsParams {
    pub descriptor_set: PathBuf,
    pub json: bool,
}

impl SymbolsParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            descriptor_set: descriptor_set(m),
            json: m.get_flag("json"),
        }
    }
}

impl From<SymbolsParams> for SymbolsArgs {
    fn from(p: SymbolsParams) -> Self {
        Self {
            descriptor_set: p.descriptor_set,
            json: p.json,
        }
    }
}

pub struct DecodeRawParams {
    pub input: Option<PathBuf>,
    // recursion_limit, max_bytes and utf8 are parsed but not extracted
}

impl DecodeRawParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: m.get_one::<PathBuf>("input").cloned(),
        }
    }
}

impl From<DecodeRawParams> for DecodeRawArgs {
    fn from(p: DecodeRawParams) -> Self {
        Self { input: p.input }
    }
}

pub struct RoundtripParams {
    pub descriptor_set: PathBuf,
    pub message_type: String,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub show: bool,
    pub deterministic: bool,
    pub recursion_limit: u32,
    pub max_bytes: u64,
    pub utf8: Option<Utf8Mode>,
}

impl RoundtripParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            descriptor_set: descriptor_set(m),
            message_type: m.get_one::<String>("message_type").cloned().unwrap_or_default(),
            input: m.get_one::<PathBuf>("input").cloned(),
            output: m.get_one::<PathBuf>("output").cloned(),
            show: m.get_flag("show"),
            deterministic: m.get_flag("deterministic"),
            recursion_limit: m.get_one::<u32>("recursion_limit").copied().unwrap_or(100),
            max_bytes: m.get_one::<u64>("max_bytes").copied().unwrap_or(64 << 20),
            utf8: parse_utf8(m),
        }
    }
}

impl From<RoundtripParams> for RoundtripArgs {
    fn from(p: RoundtripParams) -> Self {
        Self {
            descriptor_set: p.descriptor_set,
            message_type: p.message_type,
            input: p.input,
            output: p.output,
            show: p.show,
            decode: DecodeOptions::new()
                .recursion_limit(p.recursion_limit)
                .total_bytes_limit(p.max_bytes)
                .utf8_mode(p.utf8),
            encode: EncodeOptions::new()
                .deterministic(p.deterministic)
                .recursion_limit(p.recursion_limit),
        }
    }
}

fn descriptor_set(m: &ArgMatches) -> PathBuf {
    m.get_one::<PathBuf>("descriptor_set").cloned().unwrap_or_default()
}

/// `None` leaves the choice to each message's syntax.
fn parse_utf8(m: &ArgMatches) -> Option<Utf8Mode> {
    match m.get_one::<String>("utf8").map(String::as_str) {
        Some("off") => Some(Utf8Mode::Off),
        Some("warn") => Some(Utf8Mode::Warn),
        Some("strict") => Some(Utf8Mode::Strict),
        _ => None,
    }
}
