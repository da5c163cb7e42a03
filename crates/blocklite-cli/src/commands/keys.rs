use anyhow::Result;
use blocklite_core::Cid;
use blocklite_storage::{Blockstore, EnumerationReport, EnumerationState, SqliteBlockstore};
use tokio::sync::watch;

pub async fn list(store: &SqliteBlockstore, limit: Option<usize>, json: bool) -> Result<()> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut keys = store.all_keys(cancel_rx).await?;
    let mut listed: Vec<Cid> = Vec::new();

    loop {
        if limit.is_some_and(|limit| listed.len() >= limit) {
            cancel_tx.send_replace(true);
            break;
        }

        tokio::select! {
            _ = &mut ctrl_c => {
                cancel_tx.send_replace(true);
                eprintln!("Interrupted");
                break;
            }
            next = keys.recv() => match next {
                Some(cid) => {
                    if !json {
                        println!("{}", cid);
                    }
                    listed.push(cid);
                }
                None => break,
            },
        }
    }

    let report = keys.finish().await?;

    if json {
        let cids: Vec<String> = listed.iter().map(ToString::to_string).collect();
        println!("{}", serde_json::to_string_pretty(&cids)?);
    }
    describe(&report, listed.len(), limit);

    Ok(())
}

fn describe(report: &EnumerationReport, listed: usize, limit: Option<usize>) {
    if report.skipped > 0 {
        eprintln!("warning: skipped {} malformed keys", report.skipped);
    }

    match &report.state {
        EnumerationState::Completed => {}
        EnumerationState::Cancelled if limit == Some(listed) => {}
        EnumerationState::Cancelled => eprintln!("Listing stopped after {} keys", listed),
        EnumerationState::Failed(e) => {
            eprintln!("warning: listing is incomplete after {} keys: {}", listed, e)
        }
    }
}
