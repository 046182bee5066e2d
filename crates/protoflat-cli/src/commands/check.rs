use std::path::PathBuf;

use protoflat::DescriptorPool;

pub struct CheckArgs {
    pub descriptor_set: PathBuf,
    pub strict: bool,
}

pub fn run(args: CheckArgs) {
    let bytes = match std::fs::read(&args.descriptor_set) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!(
                "error: failed to read '{}': {}",
                args.descriptor_set.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let mut pool = DescriptorPool::new();
    if let Err(err) = pool.add_file_descriptor_set(&bytes) {
        eprint!("{}", err.diagnostics().render());
        std::process::exit(1);
    }

    let warnings = pool.warnings();
    if warnings.has_warnings() {
        eprint!("{}", warnings.render());
        if args.strict {
            std::process::exit(1);
        }
    }

    // Silent on success (like cargo check)
}
