use std::fmt::Display;

use anyhow::{Context, Result};
use bpaf::Bpaf;
use kiosk_sdk::kiosk::Kiosk;
use kiosk_sdk::models::market::Catalog;
use kiosk_sdk::utils::units;
use tracing::instrument;

use crate::utils::dialog::{Dialog, Select};
use crate::utils::message;

#[derive(Bpaf, Debug, Clone)]
pub struct Browse {
    /// Page to display (pages start at 1)
    #[bpaf(long, short, argument("page"))]
    page: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PageNav {
    Next,
    Previous,
    Quit,
}

impl Display for PageNav {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageNav::Next => write!(f, "Next page"),
            PageNav::Previous => write!(f, "Previous page"),
            PageNav::Quit => write!(f, "Quit"),
        }
    }
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle(self, mut kiosk: Kiosk) -> Result<()> {
        kiosk
            .marketplace
            .synchronize()
            .await
            .context("could not synchronize the catalog")?;

        let catalog = kiosk.marketplace.catalog();
        if catalog.is_empty() {
            message::plain("No items minted yet.");
            return Ok(());
        }

        let mut page = self.page.unwrap_or(1).clamp(1, catalog.total_pages());

        // One-shot print for a requested page or off a tty; otherwise page
        // interactively.
        if self.page.is_some() || !Dialog::can_prompt() {
            print_page(catalog, page);
            return Ok(());
        }

        loop {
            print_page(catalog, page);

            let mut options = Vec::new();
            if page < catalog.total_pages() {
                options.push(PageNav::Next);
            }
            if page > 1 {
                options.push(PageNav::Previous);
            }
            options.push(PageNav::Quit);

            let choice = Dialog {
                message: "Navigate",
                help_message: None,
                typed: Select { options },
            }
            .prompt()
            .await?;

            match choice {
                PageNav::Next => page = catalog.next_page(page),
                PageNav::Previous => page = catalog.previous_page(page),
                PageNav::Quit => break,
            }
        }

        Ok(())
    }
}

fn print_page(catalog: &Catalog, page: usize) {
    message::plain(format!(
        "Page {page} of {total}",
        total = catalog.total_pages()
    ));
    for item in catalog.page(page) {
        let sale = if item.for_sale {
            "for sale"
        } else {
            "not for sale"
        };
        message::plain(format!(
            "  Token {id}: price {price}, {sale}",
            id = item.token_id,
            price = units::format_amount(item.price),
        ));
    }
}
