mod cli;
mod commands;

use cli::{CheckParams, DecodeRawParams, RoundtripParams, SymbolsParams, build_cli};

fn main() {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("check", m)) => {
            let params = CheckParams::from_matches(m);
            commands::check::run(params.into());
        }
        Some(("symbols", m)) => {
            let params = SymbolsParams::from_matches(m);
            commands::symbols::run(params.into());
        }
        Some(("decode-raw", m)) => {
            let params = DecodeRawParams::from_matches(m);
            commands::decode_raw::run(params.into());
        }
        Some(("roundtrip", m)) => {
            let params = RoundtripParams::from_matches(m);
            commands::roundtrip::run(params.into());
        }
        _ => unreachable!("clap should have caught this"),
    }
}
