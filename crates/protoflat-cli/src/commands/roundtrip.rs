use std::path::PathBuf;

use protoflat::{Arena, DecodeOptions, EncodeOptions, check_initialized};

use super::input::{load_bytes, load_pool};

pub struct RoundtripArgs {
    pub descriptor_set: PathBuf,
    pub message_type: String,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub show: bool,
    pub decode: DecodeOptions,
    pub encode: EncodeOptions,
}

pub fn run(args: RoundtripArgs) {
    let pool = match load_pool(&args.descriptor_set) {
        Ok(pool) => pool,
        Err(msg) => {
            eprint!("{}", msg);
            std::process::exit(1);
        }
    };

    let Some(def) = pool.find_message_by_name(&args.message_type) else {
        eprintln!("error: message type '{}' not found", args.message_type);
        eprintln!();
        eprintln!("Run 'protoflat symbols -d {}' for the full list.", args.descriptor_set.display());
        std::process::exit(1);
    };

    let input = load_bytes(args.input.as_deref()).unwrap_or_else(|msg| {
        eprintln!("error: {}", msg);
        std::process::exit(1);
    });

    let arena = Arena::new();
    let message = match protoflat::parse_with(def, &input, &arena, &args.decode) {
        Ok(message) => message,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    for path in check_initialized(&message) {
        eprintln!("warning: missing required field `{}`", path);
    }

    if args.show {
        println!("{:#?}", message);
    }

    let output = match protoflat::serialize_with(&message, &args.encode) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let verdict = if output == input { "identical" } else { "reordered" };
    eprintln!("{} bytes in, {} bytes out ({})", input.len(), output.len(), verdict);

    if let Some(path) = &args.output
        && let Err(e) = std::fs::write(path, &output)
    {
        eprintln!("error: failed to write '{}': {}", path.display(), e);
        std::process::exit(1);
    }
}
