use anyhow::Result;
use bpaf::Bpaf;
use kiosk_sdk::kiosk::Kiosk;
use tracing::instrument;

use crate::commands::ensure_connected;
use crate::utils::message;

#[derive(Bpaf, Debug, Clone)]
pub struct Account {}

impl Account {
    #[instrument(name = "account", skip_all)]
    pub async fn handle(self, mut kiosk: Kiosk) -> Result<()> {
        let account = ensure_connected(&mut kiosk.session).await?;
        message::plain(account);
        Ok(())
    }
}
