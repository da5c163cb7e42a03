pub mod block;
pub mod keys;

use anyhow::Result;
use blocklite_storage::SqliteBlockstore;

use crate::cli::Commands;

pub async fn handle(cmd: Commands, store: &SqliteBlockstore) -> Result<()> {
    match cmd {
        Commands::Put { files } => block::put(store, files).await,
        Commands::Get { cid, output } => block::get(store, cid, output).await,
        Commands::Has { cid } => block::has(store, cid).await,
        Commands::Stat { cid, json } => block::stat(store, cid, json).await,
        Commands::Rm { cids } => block::remove(store, cids).await,
        Commands::Ls { limit, json } => keys::list(store, limit, json).await,
    }
}
