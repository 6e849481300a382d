use anyhow::{Context, Result};
use bpaf::Bpaf;
use kiosk_sdk::data::TokenId;
use kiosk_sdk::kiosk::Kiosk;
use kiosk_sdk::models::marketplace::PendingAction;
use kiosk_sdk::utils::units;
use tracing::instrument;

use crate::commands::{ensure_connected, resync_after_mutation};
use crate::utils::message;

#[derive(Bpaf, Debug, Clone)]
pub struct SetPrice {
    /// Id of the item to re-price
    #[bpaf(positional("token-id"))]
    token_id: TokenId,

    /// New price, in display units (e.g. "1.5")
    #[bpaf(positional("price"))]
    price: String,
}

impl SetPrice {
    #[instrument(name = "set-price", skip_all)]
    pub async fn handle(self, mut kiosk: Kiosk) -> Result<()> {
        let new_price = units::parse_amount(&self.price)
            .with_context(|| format!("invalid price {:?}", self.price))?;

        let account = ensure_connected(&mut kiosk.session).await?;
        let record = kiosk
            .marketplace
            .submit(
                PendingAction::SetPrice {
                    token_id: self.token_id,
                    new_price,
                },
                &account,
            )
            .await
            .with_context(|| format!("could not re-price item {}", self.token_id))?;

        message::updated(format!("Price change confirmed: {}", record.hash));
        resync_after_mutation(&mut kiosk).await;
        Ok(())
    }
}
