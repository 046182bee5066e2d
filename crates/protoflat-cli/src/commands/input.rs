use std::fs;
use std::io::{self, Read};
use std::path::Path;

use protoflat::DescriptorPool;

/// Reads encoded bytes from `path`, or from stdin when it is absent or `-`.
pub fn load_bytes(path: Option<&Path>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            fs::read(path).map_err(|e| format!("failed to read '{}': {}", path.display(), e))
        }
        _ => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| format!("failed to read stdin: {}", e))?;
            Ok(buf)
        }
    }
}

/// Loads a serialized `FileDescriptorSet` into a fresh pool.
///
/// Rejected schemas come back as rendered diagnostics.
pub fn load_pool(path: &Path) -> Result<DescriptorPool, String> {
    let bytes =
        fs::read(path).map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_set(&bytes)
        .map_err(|e| e.diagnostics().render())?;
    Ok(pool)
}
