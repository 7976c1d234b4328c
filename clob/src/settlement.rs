use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::types::SettlementBatch;

/// Consumer of match batches. Matching is authoritative: an implementation
/// may retry or report failures out of band, but nothing it does rolls back
/// a match.
#[async_trait]
pub trait Settler: Send + Sync {
    async fn settle(&self, batch: &SettlementBatch) -> anyhow::Result<()>;
}

/// Drains the engine's settlement channel on its own task so the matching
/// path never waits on a collaborator. Failed batches are logged and dropped.
pub fn spawn_settlement_worker(
    mut batches: UnboundedReceiver<SettlementBatch>,
    settler: Arc<dyn Settler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(batch) = batches.recv().await {
            if let Err(err) = settler.settle(&batch).await {
                error!(market = %batch.market, %err, "settlement batch failed");
            }
        }
        info!("settlement worker stopped");
    })
}

/// Discards every batch. Useful for wiring an engine without a collaborator.
pub struct NoopSettler;

#[async_trait]
impl Settler for NoopSettler {
    async fn settle(&self, _batch: &SettlementBatch) -> anyhow::Result<()> {
        Ok(())
    }
}
