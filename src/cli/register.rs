use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use tokio::task::block_in_place;

use crate::cli::{SubCommandExtend, read_vector};
use crate::config::{AddressOptions, EmbedOptions, Opts};
use crate::embed::{Embedder, OpenAiEmbedder};
use crate::error::Error;
use crate::fingerprint::Digest;
use crate::registry::{FingerprintRegistry, LmdbLedger, Metadata, Provenance};
use crate::server::ProcessResponse;
use crate::submission::{Submission, process};

#[derive(Parser, Debug, Clone)]
pub struct RegisterCommand {
    #[command(flatten)]
    pub address: AddressOptions,
    #[command(flatten)]
    pub embed: EmbedOptions,
    /// 图片向量文件（JSON 数组）
    #[arg(long, value_name = "PATH")]
    pub image: PathBuf,
    /// 客户端计算的图片摘要，提供时会校验与图片向量是否一致
    #[arg(long, value_name = "HEX")]
    pub image_hash: Option<Digest>,
    /// 文本向量文件（JSON 数组）
    #[arg(long, value_name = "PATH", required_unless_present = "text", conflicts_with = "text")]
    pub text_vector: Option<PathBuf>,
    /// 文本内容，通过向量接口计算文本向量
    #[arg(long)]
    pub text: Option<String>,
    /// 提交者身份
    #[arg(long, default_value_t = String::new())]
    pub submitter: String,
    /// 外部内容定位符
    #[arg(long, default_value_t = String::new())]
    pub content_locator: String,
    /// 外部元数据定位符
    #[arg(long, default_value_t = String::new())]
    pub metadata_locator: String,
    /// 辅助种子
    #[arg(short, long)]
    pub seed: Option<String>,
}

impl SubCommandExtend for RegisterCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let image = read_vector(&self.image)?;
        let text = match (&self.text_vector, &self.text) {
            (Some(path), _) => read_vector(path)?,
            (None, Some(text)) => OpenAiEmbedder::new(&self.embed).embed_text(text).await?,
            (None, None) => return Err(Error::MissingField("text").into()),
        };

        let submission = Submission {
            image,
            text,
            image_hash: self.image_hash,
            metadata: Metadata {
                provenance: Provenance {
                    submitter: self.submitter.clone(),
                    content_locator: self.content_locator.clone(),
                    metadata_locator: self.metadata_locator.clone(),
                },
                seed: self.seed.clone(),
            },
        };

        let deriver = self.address.deriver()?;
        let result = block_in_place(|| {
            let ledger = LmdbLedger::open(opts.conf_dir.ledger())?;
            let registry = FingerprintRegistry::new(ledger, deriver);
            process(&registry, submission)
        });

        match result {
            Ok(processed) => {
                info!("注册完成: {}", processed.registration.entry.address);
                let response = ProcessResponse::from(processed);
                println!("{}", serde_json::to_string_pretty(&response)?);
                Ok(())
            }
            Err(Error::DuplicateFingerprint(existing)) => {
                warn!("该内容已注册");
                println!("{}", serde_json::to_string_pretty(&existing)?);
                anyhow::bail!("指纹已注册: {}", existing.address)
            }
            Err(e) => Err(e.into()),
        }
    }
}
