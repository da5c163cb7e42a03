use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use blocklite_core::{Block, Cid};
use blocklite_storage::{Blockstore, MISSING_SIZE, SqliteBlockstore};

pub async fn put(store: &SqliteBlockstore, files: Vec<PathBuf>) -> Result<()> {
    let blocks = read_blocks(&files).await?;
    store.put_many(&blocks).await?;

    for (block, file) in blocks.iter().zip(&files) {
        println!("{}  {}", block.cid(), file.display());
    }
    Ok(())
}

pub async fn get(store: &SqliteBlockstore, cid: Cid, output: Option<PathBuf>) -> Result<()> {
    let block = store.get(&cid).await?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, block.data())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("✓ Wrote {} bytes to {}", block.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(block.data())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

pub async fn has(store: &SqliteBlockstore, cid: Cid) -> Result<()> {
    println!("{}", store.has(&cid).await?);
    Ok(())
}

pub async fn stat(store: &SqliteBlockstore, cid: Cid, json: bool) -> Result<()> {
    let size = size_or_missing(store, &cid).await?;

    if json {
        let value = serde_json::json!({ "cid": cid.to_string(), "size": size });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", size);
    }
    Ok(())
}

pub async fn remove(store: &SqliteBlockstore, cids: Vec<Cid>) -> Result<()> {
    for cid in cids {
        store.delete_block(&cid).await?;
        println!("✓ Removed {}", cid);
    }
    Ok(())
}

/// Read files into blocks named by their BLAKE3 raw CIDs.
async fn read_blocks(files: &[PathBuf]) -> Result<Vec<Block>> {
    let mut blocks = Vec::with_capacity(files.len());
    for file in files {
        let data = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        blocks.push(Block::new(data)?);
    }
    Ok(blocks)
}

/// Payload size, or [`MISSING_SIZE`] when the block is absent.
async fn size_or_missing(store: &SqliteBlockstore, cid: &Cid) -> Result<i64> {
    match store.get_size(cid).await {
        Ok(size) => Ok(i64::try_from(size)?),
        Err(e) if e.is_not_found() => Ok(MISSING_SIZE),
        Err(e) => Err(e.into()),
    }
}
