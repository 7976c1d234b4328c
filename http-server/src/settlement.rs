use async_trait::async_trait;
use clob::{Settler, SettlementBatch, Side};
use tracing::{debug, warn};

use crate::market_scale;
use crate::models::AccountStore;

/// Settlement collaborator backed by the in-memory ledger: every match
/// becomes a base-against-quote transfer between maker and taker at the
/// trade price. Transfers that cannot resolve an account are skipped;
/// the match itself stands regardless.
pub struct LedgerSettler {
    accounts: AccountStore,
}

impl LedgerSettler {
    pub fn new(accounts: AccountStore) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl Settler for LedgerSettler {
    async fn settle(&self, batch: &SettlementBatch) -> anyhow::Result<()> {
        let scale = market_scale(&batch.market) as f64;

        for settlement in &batch.settlements {
            // The buyer receives base and pays quote; who that is depends on
            // which side took.
            let (buyer, seller) = match batch.taker_side {
                Side::Bid => (settlement.taker_user_id, settlement.maker_user_id),
                Side::Ask => (settlement.maker_user_id, settlement.taker_user_id),
            };
            let base_amount = settlement.size as f64 / scale;
            let quote_amount = base_amount * (settlement.price as f64 / scale);

            match self.accounts.transfer(seller, buyer, base_amount, quote_amount) {
                Ok(()) => debug!(
                    market = %batch.market,
                    buyer,
                    seller,
                    size = settlement.size,
                    price = settlement.price,
                    "settled match"
                ),
                Err(err) => warn!(
                    market = %batch.market,
                    buyer,
                    seller,
                    %err,
                    "settlement transfer skipped"
                ),
            }
        }

        Ok(())
    }
}
