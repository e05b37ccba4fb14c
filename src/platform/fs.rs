// Folio - platform/fs.rs
//
// Post file reading: size guard, transient-error retry, strict UTF-8.

use crate::util::constants::{READ_MAX_RETRIES, READ_RETRY_DELAYS_MS};
use crate::util::error::LoadError;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Read a post file as UTF-8 text.
///
/// Files larger than `max_size` are refused before any content is read.
/// Transient I/O errors (interrupted, would-block, timed-out) are retried
/// with capped backoff; anything else fails immediately.
pub fn read_post_file(path: &Path, max_size: u64) -> Result<String, LoadError> {
    let size = std::fs::metadata(path)
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if size > max_size {
        return Err(LoadError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: max_size,
        });
    }

    let bytes = read_with_retry(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    String::from_utf8(bytes).map_err(|source| LoadError::InvalidEncoding {
        path: path.to_path_buf(),
        source,
    })
}

fn read_with_retry(path: &Path) -> io::Result<Vec<u8>> {
    let mut last_err: Option<io::Error> = None;

    for attempt in 0..READ_MAX_RETRIES {
        match std::fs::read(path) {
            Ok(bytes) => return Ok(bytes),
            Err(e) if is_transient_error(&e) => {
                tracing::debug!(
                    file = %path.display(),
                    attempt = attempt + 1,
                    error = %e,
                    "Transient I/O error, retrying"
                );
                std::thread::sleep(Duration::from_millis(
                    READ_RETRY_DELAYS_MS[attempt as usize],
                ));
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::other("Unknown read error")))
}

/// Returns true for transient I/O errors that are worth retrying.
fn is_transient_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}
