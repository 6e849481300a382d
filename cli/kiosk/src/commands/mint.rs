use anyhow::{Context, Result};
use bpaf::Bpaf;
use kiosk_sdk::kiosk::Kiosk;
use kiosk_sdk::models::marketplace::PendingAction;
use kiosk_sdk::utils::units;
use tracing::instrument;

use crate::commands::{ensure_connected, resync_after_mutation};
use crate::utils::message;

#[derive(Bpaf, Debug, Clone)]
pub struct Mint {
    /// Asking price of the new item, in display units (e.g. "1.5")
    #[bpaf(positional("price"))]
    price: String,
}

impl Mint {
    #[instrument(name = "mint", skip_all)]
    pub async fn handle(self, mut kiosk: Kiosk) -> Result<()> {
        let price = units::parse_amount(&self.price)
            .with_context(|| format!("invalid price {:?}", self.price))?;

        let account = ensure_connected(&mut kiosk.session).await?;
        let record = kiosk
            .marketplace
            .submit(PendingAction::Mint { price }, &account)
            .await
            .context("could not mint the item")?;

        message::updated(format!("Mint confirmed: {}", record.hash));
        resync_after_mutation(&mut kiosk).await;
        Ok(())
    }
}
