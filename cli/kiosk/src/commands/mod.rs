mod account;
mod browse;
mod buy;
mod mint;
mod set_price;
mod toggle_sale;

use std::fmt;

use anyhow::{Result, bail};
use bpaf::{Bpaf, ParseFailure, Parser};
use indoc::indoc;
use kiosk_sdk::data::Account;
use kiosk_sdk::kiosk::Kiosk;
use kiosk_sdk::models::session::WalletSession;
use tracing::debug;

use crate::config::Config;
use crate::utils::dialog::{Confirm, Dialog};
use crate::utils::init::{init_ledger_client, init_wallet_client};
use crate::utils::message;

static KIOSK_DESCRIPTION: &'_ str = indoc! {"
    Kiosk is a marketplace client for uniquely numbered tokenized items.

    Browse the catalog, mint new items, buy items that are for sale,
    and re-price or toggle the sale flag of items you own."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(KIOSK_DESCRIPTION))]
pub struct KioskCli(#[bpaf(external(kiosk_args))] pub KioskArgs);

/// Main kiosk args parser
///
/// This struct is used to parse the command line arguments
/// and allows to be composed with other parsers.
///
/// To parse the kiosk CLI, use [`KioskCli`] instead using [`kiosk_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)] // we don't want this struct to be interpreted as a group
pub struct KioskArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    /// Print the version of the program
    #[allow(dead_code)] // fake arg, `--version` is checked for separately (see [Version])
    #[bpaf(long, short('V'))]
    version: bool,

    #[bpaf(external(commands), optional)]
    command: Option<Commands>,
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command")
    }
}

impl KioskArgs {
    /// Dispatch the parsed command against a fresh [Kiosk] session.
    pub async fn handle(self, config: Config) -> Result<()> {
        let Some(command) = self.command else {
            display_help(None);
            return Ok(());
        };

        let ledger = init_ledger_client(&config)?;
        let wallet = init_wallet_client(&config);
        let kiosk = Kiosk::new(ledger, wallet);

        match command {
            Commands::Browse(args) => args.handle(kiosk).await,
            Commands::Mint(args) => args.handle(kiosk).await,
            Commands::Buy(args) => args.handle(kiosk).await,
            Commands::SetPrice(args) => args.handle(kiosk).await,
            Commands::ToggleSale(args) => args.handle(kiosk).await,
            Commands::Account(args) => args.handle(kiosk).await,
        }
    }
}

/// Kiosk commands
#[derive(Bpaf, Clone)]
enum Commands {
    /// Browse the item catalog
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),

    /// Mint a new item
    #[bpaf(command)]
    Mint(#[bpaf(external(mint::mint))] mint::Mint),

    /// Buy an item that is for sale
    #[bpaf(command)]
    Buy(#[bpaf(external(buy::buy))] buy::Buy),

    /// Re-price an item you own
    #[bpaf(command("set-price"))]
    SetPrice(#[bpaf(external(set_price::set_price))] set_price::SetPrice),

    /// Toggle the sale flag of an item you own
    #[bpaf(command("toggle-sale"))]
    ToggleSale(#[bpaf(external(toggle_sale::toggle_sale))] toggle_sale::ToggleSale),

    /// Show the session's wallet account
    #[bpaf(command)]
    Account(#[bpaf(external(account::account))] account::Account),
}

/// Force `--help` output for `kiosk` with a given command
pub fn display_help(cmd: Option<String>) {
    let mut args = Vec::from_iter(cmd.as_deref());
    args.push("--help");

    match kiosk_cli().run_inner(&*args) {
        Ok(_) => unreachable!(),
        Err(ParseFailure::Completion(comp)) => print!("{comp:80}"),
        Err(ParseFailure::Stdout(doc, _)) => message::plain(format!("{doc:80}")),
        Err(ParseFailure::Stderr(err)) => message::error(err),
    }
}

/// Special command to check for the presence of the `--version` flag
///
/// bpaf allows `kiosk --invalid option --version`
/// (https://github.com/pacak/bpaf/issues/288) but common utilities,
/// such as git always require correct arguments even in the presence of
/// short circuiting flags such as `--version`
#[derive(Bpaf, Default)]
pub struct Version(#[bpaf(short('V'), long("version"))] bool);

impl Version {
    /// Parses to [Self] and extract the `--version` flag
    pub fn check() -> bool {
        bpaf::construct!(version(), kiosk_args())
            .to_options()
            .run_inner(bpaf::Args::current_args())
            .map(|(v, _)| v)
            .unwrap_or_default()
            .0
    }
}

/// Gate a mutating command behind a connected wallet session.
///
/// One uniform policy for every action kind: a disconnected session gets the
/// connect prompt; declining aborts the action. Off a tty the connection is
/// attempted directly, since the wallet provider runs its own confirmation.
pub(crate) async fn ensure_connected(session: &mut WalletSession) -> Result<Account> {
    if let Some(account) = session.account() {
        return Ok(account.clone());
    }

    if Dialog::can_prompt() {
        let confirmed = Dialog {
            message: "Connect your wallet to continue?",
            help_message: Some("The wallet provider will ask for account access"),
            typed: Confirm {
                default: Some(true),
            },
        }
        .prompt()
        .await?;

        if !confirmed {
            bail!("wallet not connected");
        }
    }

    let account = session.connect().await?;
    message::updated(format!("Connected as {account}"));
    Ok(account)
}

/// Rebuild the catalog snapshot scheduled by a confirmed mutation.
///
/// A failed rebuild is logged and leaves the previous snapshot in place,
/// stale but consistent; the confirmed mutation itself already happened.
pub(crate) async fn resync_after_mutation(kiosk: &mut Kiosk) {
    if !kiosk.marketplace.take_scheduled_resync() {
        return;
    }
    if let Err(err) = kiosk.marketplace.synchronize().await {
        debug!(error = %err, "catalog refresh after mutation failed");
        message::warning("Could not refresh the catalog; listings may be out of date");
    }
}
