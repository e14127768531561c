use std::sync::Arc;

use clap::Parser;
use log::{info, warn};
use rand::distr::{Alphanumeric, SampleString};
use tokio::net::TcpListener;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{AddressOptions, EmbedOptions};
use crate::embed::{Embedder, OpenAiEmbedder};
use crate::registry::{FingerprintRegistry, Ledger, LmdbLedger};
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub address: AddressOptions,
    #[command(flatten)]
    pub embed: EmbedOptions,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:3001")]
    pub addr: String,
    /// 请求验证 token，不填则随机生成
    #[arg(long, default_value_t = String::new())]
    pub token: String,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let deriver = self.address.deriver()?;
        let ledger = block_in_place(|| LmdbLedger::open(opts.conf_dir.ledger()))?;
        info!("账本中已有 {} 个条目", ledger.len()?);

        let embedder = OpenAiEmbedder::new(&self.embed);
        if !embedder.has_credentials() {
            warn!("未设置 OPENAI_API_KEY，文本向量请求可能被拒绝");
        }

        let mut token = self.token.clone();
        if token.is_empty() {
            token = Alphanumeric.sample_string(&mut rand::rng(), 32);
            info!("鉴权 token: {token}");
        }

        let ledger: Arc<dyn Ledger> = Arc::new(ledger);
        let embedder: Arc<dyn Embedder> = Arc::new(embedder);
        let state = server::AppState::new(FingerprintRegistry::new(ledger, deriver), embedder, token);

        let app = server::create_app(state);

        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
