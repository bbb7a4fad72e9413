//! Watch command implementation.
//!
//! Prints new block heights as they arrive, over push notifications when
//! the node supports them and by polling otherwise.

use super::query::connect;
use crate::client::NodeClient;
use crate::utils::config::ClientConfig;
use anyhow::{Context, Result};
use log::info;

/// Arguments for the watch command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchArgs {
    /// Skip the push attempt and poll right away
    pub force_poll: bool,

    /// Stop after this many blocks (None = run until interrupted)
    pub count: Option<usize>,
}

/// Connect, then print every new block height
///
/// **Public** - main entry point called from main.rs
pub fn execute_watch(rpc_url: &str, config: ClientConfig, args: &WatchArgs) -> Result<()> {
    validate_watch_args(args)?;
    let client = connect(rpc_url, config)?;

    let seen = watch_blocks(&client, args, |number| println!("{}", number))?;
    info!("Received {} blocks", seen);

    client.close().context("Failed to close connection")?;
    Ok(())
}

/// Feed new block heights to `on_block` until `count` is reached or the
/// subscription ends
///
/// **Public** - separated from printing so it can run against any transport
///
/// # Returns
/// Number of heights delivered
pub fn watch_blocks<F>(client: &NodeClient, args: &WatchArgs, mut on_block: F) -> Result<usize>
where
    F: FnMut(u64),
{
    validate_watch_args(args)?;

    let subscription = client
        .subscribe(args.force_poll)
        .context("Failed to subscribe to new blocks")?;
    info!("Watching new blocks ({:?} mode)", subscription.mode());

    let mut seen = 0;
    for number in subscription.iter() {
        on_block(number);
        seen += 1;

        if args.count.is_some_and(|count| seen >= count) {
            break;
        }
    }

    subscription.cancel();
    Ok(seen)
}

/// Validate watch arguments
pub fn validate_watch_args(args: &WatchArgs) -> Result<()> {
    if args.count == Some(0) {
        anyhow::bail!("count must be greater than 0");
    }

    Ok(())
}
