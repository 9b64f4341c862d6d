//! Streamed asset download into the storage slot

use crate::error::{PipelineError, Result};
use crate::net::Transport;
use crate::storage::AssetSlot;
use std::io::{ErrorKind, Read, Write};

/// Replace the slot's content with the body of `url`, streaming in fixed
/// chunks. Returns the number of bytes written.
pub fn download_asset(transport: &dyn Transport, url: &str, slot: &AssetSlot) -> Result<u64> {
    slot.clear()?;

    let mut body = transport
        .get(url)
        .map_err(|e| PipelineError::Download(e.to_string()))?;
    let mut file = slot.create()?;

    let mut written: u64 = 0;
    let mut buf = [0u8; 4096];
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(PipelineError::Download(e.to_string())),
        };
        file.write_all(&buf[..n])
            .map_err(|e| slot.storage_error(e))?;
        written += n as u64;
    }
    file.flush().map_err(|e| slot.storage_error(e))?;

    if written == 0 {
        return Err(PipelineError::Download("empty body".into()));
    }
    Ok(written)
}
