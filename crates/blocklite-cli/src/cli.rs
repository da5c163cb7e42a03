use std::path::PathBuf;

use blocklite_core::{Cid, parse_cid};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blocklite")]
#[command(about = "Content-addressed block storage on SQLite", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Blockstore file (overrides the configured database)
    #[arg(long, global = true, env = "BLOCKLITE_DB")]
    pub db: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store files as blocks and print their CIDs
    Put {
        /// Files to store
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write a block's payload to stdout or a file
    Get {
        #[arg(value_parser = parse_cid)]
        cid: Cid,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print whether a block is stored
    Has {
        #[arg(value_parser = parse_cid)]
        cid: Cid,
    },

    /// Print a block's payload size (-1 when absent)
    Stat {
        #[arg(value_parser = parse_cid)]
        cid: Cid,

        #[arg(long)]
        json: bool,
    },

    /// Delete blocks
    Rm {
        #[arg(value_parser = parse_cid, required = true)]
        cids: Vec<Cid>,
    },

    /// List stored keys as raw CIDv1s
    Ls {
        /// Stop after this many keys
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },
}
