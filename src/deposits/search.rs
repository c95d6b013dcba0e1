//! Timestamp to block-height resolution and block-range windowing.

use crate::blockchain::client::ChainRpc;
use crate::blockchain::types::{BlockRef, ChainResult};

/// Find the first block whose timestamp is at or after `timestamp`.
///
/// Targets at or past the latest block's timestamp resolve to the latest
/// block without searching. Otherwise the search makes one block lookup per
/// halving of `[0, latest]` and returns early on an exact match.
pub async fn block_from_date(connection: &dyn ChainRpc, timestamp: u64) -> ChainResult<u64> {
    let latest = connection.block(BlockRef::Latest).await?;
    if timestamp >= latest.timestamp {
        return Ok(latest.number);
    }

    let mut low = 0u64;
    let mut high = latest.number;
    while low < high {
        let mid = low + (high - low) / 2;
        let block = connection.block(BlockRef::Number(mid)).await?;

        if block.timestamp == timestamp {
            return Ok(mid);
        }
        if block.timestamp < timestamp {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    tracing::debug!(
        network = connection.network(),
        timestamp,
        block = high,
        "Resolved timestamp to block"
    );
    Ok(high)
}

/// Split `[from, to]` into consecutive inclusive windows of at most `size` blocks.
pub fn block_windows(from: u64, to: u64, size: u64) -> BlockWindows {
    BlockWindows {
        next: (from <= to).then_some(from),
        to,
        size: size.max(1),
    }
}

/// Iterator returned by [`block_windows`].
#[derive(Debug, Clone)]
pub struct BlockWindows {
    next: Option<u64>,
    to: u64,
    size: u64,
}

impl Iterator for BlockWindows {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start.saturating_add(self.size - 1).min(self.to);
        self.next = if end < self.to { Some(end + 1) } else { None };
        Some((start, end))
    }
}
