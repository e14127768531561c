use anyhow::Result;
use clap::Parser;
use serde_json::json;

use crate::address::Address;
use crate::cli::SubCommandExtend;
use crate::config::{AddressOptions, Opts, OutputFormat};
use crate::fingerprint::Digest;

#[derive(Parser, Debug, Clone)]
pub struct DeriveCommand {
    #[command(flatten)]
    pub address: AddressOptions,
    /// 组合摘要（十六进制）
    pub digest: Digest,
    /// 辅助种子，哈希后追加在组合摘要之后
    #[arg(short, long)]
    pub seed: Option<String>,
    /// 校验该地址是否由上述输入推导而来
    #[arg(long, value_name = "ADDRESS")]
    pub verify: Option<Address>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for DeriveCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let deriver = self.address.deriver()?;
        let derived = deriver.derive_with_seed(&self.digest, self.seed.as_deref())?;

        if let Some(expected) = &self.verify {
            if expected != &derived.address {
                anyhow::bail!("地址不匹配: 期望 {expected}，推导结果 {}", derived.address);
            }
        }

        match self.output_format {
            OutputFormat::Json => {
                let value = json!({ "address": derived.address, "bump": derived.bump });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Table => println!("{}\t{}", derived.address, derived.bump),
        }
        Ok(())
    }
}
