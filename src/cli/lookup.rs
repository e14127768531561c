use anyhow::Result;
use clap::Parser;
use tokio::task::block_in_place;

use crate::address::Address;
use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::registry::{Ledger, LmdbLedger};

#[derive(Parser, Debug, Clone)]
pub struct LookupCommand {
    /// 注册地址（base58）
    pub address: Address,
}

impl SubCommandExtend for LookupCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let entry = block_in_place(|| {
            let ledger = LmdbLedger::open(opts.conf_dir.ledger())?;
            ledger.get(&self.address)
        })?;
        match entry {
            Some(entry) => {
                println!("{}", serde_json::to_string_pretty(&entry)?);
                Ok(())
            }
            None => anyhow::bail!("地址 {} 上没有注册条目", self.address),
        }
    }
}
