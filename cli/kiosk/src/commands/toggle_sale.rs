use anyhow::{Context, Result};
use bpaf::Bpaf;
use kiosk_sdk::data::TokenId;
use kiosk_sdk::kiosk::Kiosk;
use kiosk_sdk::models::marketplace::PendingAction;
use tracing::instrument;

use crate::commands::{ensure_connected, resync_after_mutation};
use crate::utils::message;

#[derive(Bpaf, Debug, Clone)]
pub struct ToggleSale {
    /// Id of the item whose sale flag to flip
    #[bpaf(positional("token-id"))]
    token_id: TokenId,
}

impl ToggleSale {
    #[instrument(name = "toggle-sale", skip_all)]
    pub async fn handle(self, mut kiosk: Kiosk) -> Result<()> {
        let account = ensure_connected(&mut kiosk.session).await?;
        let record = kiosk
            .marketplace
            .submit(
                PendingAction::ToggleSale {
                    token_id: self.token_id,
                },
                &account,
            )
            .await
            .with_context(|| format!("could not toggle sale of item {}", self.token_id))?;

        message::updated(format!("Sale toggle confirmed: {}", record.hash));
        resync_after_mutation(&mut kiosk).await;
        Ok(())
    }
}
