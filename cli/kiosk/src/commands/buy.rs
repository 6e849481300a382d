use anyhow::{Context, Result};
use bpaf::Bpaf;
use kiosk_sdk::data::TokenId;
use kiosk_sdk::kiosk::Kiosk;
use kiosk_sdk::models::marketplace::PendingAction;
use tracing::instrument;

use crate::commands::{ensure_connected, resync_after_mutation};
use crate::utils::message;

#[derive(Bpaf, Debug, Clone)]
pub struct Buy {
    /// Id of the item to buy
    #[bpaf(positional("token-id"))]
    token_id: TokenId,
}

impl Buy {
    #[instrument(name = "buy", skip_all)]
    pub async fn handle(self, mut kiosk: Kiosk) -> Result<()> {
        let account = ensure_connected(&mut kiosk.session).await?;

        // The submission pins the price from the authorizing read; the
        // ledger rejects the buy if the price moved since.
        let record = kiosk
            .marketplace
            .submit(
                PendingAction::Buy {
                    token_id: self.token_id,
                },
                &account,
            )
            .await
            .with_context(|| format!("could not buy item {}", self.token_id))?;

        message::updated(format!("Buy confirmed: {}", record.hash));
        resync_after_mutation(&mut kiosk).await;
        Ok(())
    }
}
