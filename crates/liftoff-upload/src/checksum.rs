//! Source file checksums
//!
//! The commit call takes an MD5 hex digest of the complete asset so the
//! store can verify the reassembled parts.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

/// MD5 hex digest of everything `reader` yields
pub fn md5_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Md5::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// MD5 hex digest of the file at `path`
pub fn md5_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    md5_reader(&mut file)
}
