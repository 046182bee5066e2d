use std::path::PathBuf;

use super::input::load_bytes;

pub struct DecodeRawArgs {
    pub input: Option<PathBuf>,
}

pub fn run(args: DecodeRawArgs) {
    let bytes = match load_bytes(args.input.as_deref()) {
        Ok(bytes) => bytes,
        Err(msg) => {
            eprintln!("error: {}", msg);
            std::process::exit(1);
        }
    };

    match protoflat::decode_raw(&bytes) {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
