//! Header-based format classification of the stored asset

use crate::constants::{PNG_MAGIC, SNIFF_LEN};
use crate::error::Result;
use crate::storage::AssetSlot;
use crate::types::{FormatTag, SniffResult};
use std::io::Read;

/// Classify `header` by its leading bytes
pub fn classify(header: &[u8]) -> SniffResult {
    if header.len() >= PNG_MAGIC.len() && header[..PNG_MAGIC.len()] == PNG_MAGIC {
        SniffResult::Recognized(FormatTag::Png)
    } else {
        SniffResult::Unrecognized
    }
}

/// Read at most the first `SNIFF_LEN` bytes of the slot and classify them.
/// An unrecognized asset is removed before returning.
pub fn sniff_asset(slot: &AssetSlot) -> Result<SniffResult> {
    let mut header = Vec::with_capacity(SNIFF_LEN);
    {
        let file = slot.open()?;
        file.take(SNIFF_LEN as u64)
            .read_to_end(&mut header)
            .map_err(|e| slot.storage_error(e))?;
    }

    let result = classify(&header);
    if result == SniffResult::Unrecognized {
        slot.clear()?;
    }
    Ok(result)
}
