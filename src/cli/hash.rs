use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, read_vector};
use crate::config::Opts;
use crate::fingerprint::{hash_vector, serialize_vector};
use crate::vector::normalize;

#[derive(Parser, Debug, Clone)]
pub struct HashCommand {
    /// JSON 数组格式的向量文件
    pub path: PathBuf,
    /// 先做 L2 归一化再计算摘要
    #[arg(short, long)]
    pub normalize: bool,
    /// 同时输出规范序列化文本
    #[arg(long)]
    pub show_serialized: bool,
}

impl SubCommandExtend for HashCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let vector = read_vector(&self.path)?;
        let values = match self.normalize {
            true => normalize(&vector).as_slice().to_vec(),
            false => vector.as_slice().to_vec(),
        };
        if self.show_serialized {
            println!("{}", serialize_vector(&values));
        }
        println!("{}", hash_vector(&values));
        Ok(())
    }
}
