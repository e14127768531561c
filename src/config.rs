use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::address::{Address, AddressDeriver, DEFAULT_PREFIX, DEFAULT_PROGRAM_ID};
use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs =
        ProjectDirs::from("", "memecanon", "memecanon").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().expect("config dir is not valid utf-8")
}

#[derive(Parser, Debug, Clone)]
pub struct AddressOptions {
    /// 目标地址空间的程序 ID（base58）
    #[arg(long, value_name = "PUBKEY", default_value = DEFAULT_PROGRAM_ID)]
    pub program_id: Address,
    /// 地址推导使用的命名空间前缀，最长 32 字节
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,
}

impl AddressOptions {
    pub fn deriver(&self) -> crate::Result<AddressDeriver> {
        AddressDeriver::new(self.program_id, self.prefix.as_bytes())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct EmbedOptions {
    /// 文本向量接口地址，需兼容 OpenAI `/v1/embeddings`
    #[arg(long, value_name = "URL", default_value = "https://api.openai.com/v1/embeddings")]
    pub embed_url: String,
    /// 文本向量模型
    #[arg(long, value_name = "MODEL", default_value = "text-embedding-3-small")]
    pub embed_model: String,
    /// 接口密钥
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "memecanon", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// memecanon 配置目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 计算向量文件的摘要
    Hash(HashCommand),
    /// 由组合摘要推导地址
    Derive(DeriveCommand),
    /// 计算指纹并注册到本地账本
    Register(RegisterCommand),
    /// 查询地址上的注册条目
    Lookup(LookupCommand),
    /// 批量计算目录中提交的指纹，找出地址冲突的重复提交
    Scan(ScanCommand),
    /// 启动 HTTP 服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回账本目录的路径
    pub fn ledger(&self) -> PathBuf {
        self.path.join("ledger")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// JSON 格式
    #[default]
    Json,
    /// 制表符分隔的表格
    Table,
}
