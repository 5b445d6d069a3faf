//! Persistent chain subscription.
//!
//! A single polling task per session watches the block height and forwards
//! new contract logs followed by a `NewBlock` notification.

use std::sync::Arc;
use std::time::Duration;

use auction_types::LogEntry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::provider::Provider;

/// Buffered notifications before the poller waits on the consumer.
const CHANNEL_CAPACITY: usize = 64;

/// Something observed on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainNotification {
    /// Block height advanced to the given height
    NewBlock(u64),
    /// Contract event recorded in a new block
    Contract(LogEntry),
}

/// Start the polling task.
///
/// The first successful poll emits `NewBlock` for the current height. After
/// that a notification batch is emitted whenever the height increases. The
/// task exits once the returned receiver is dropped.
pub fn spawn_subscription<P: Provider + 'static>(
    provider: Arc<P>,
    interval: Duration,
) -> (mpsc::Receiver<ChainNotification>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handle = tokio::spawn(poll_blocks(provider, interval, tx));
    (rx, handle)
}

async fn poll_blocks<P: Provider>(
    provider: Arc<P>,
    interval: Duration,
    tx: mpsc::Sender<ChainNotification>,
) {
    let mut last_seen: Option<u64> = None;

    while !tx.is_closed() {
        match poll_once(provider.as_ref(), last_seen).await {
            Ok(Some((height, logs))) => {
                debug!(height, logs = logs.len(), "New block observed");
                for log in logs {
                    if tx.send(ChainNotification::Contract(log)).await.is_err() {
                        return;
                    }
                }
                if tx.send(ChainNotification::NewBlock(height)).await.is_err() {
                    return;
                }
                last_seen = Some(height);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Block poll failed"),
        }

        tokio::time::sleep(interval).await;
    }
}

/// One poll. Returns the new height and its logs if the height advanced.
async fn poll_once<P: Provider>(
    provider: &P,
    last_seen: Option<u64>,
) -> Result<Option<(u64, Vec<LogEntry>)>, crate::ClientError> {
    let height = provider.block_number().await?;

    match last_seen {
        None => Ok(Some((height, Vec::new()))),
        Some(last) if height > last => {
            let logs = provider.logs_since(last + 1).await?;
            Ok(Some((height, logs)))
        }
        Some(_) => Ok(None),
    }
}
