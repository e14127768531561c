mod derive;
mod hash;
mod lookup;
mod register;
mod scan;
mod server;

use std::path::Path;

use anyhow::Context;
pub use derive::*;
pub use hash::*;
pub use lookup::*;
pub use register::*;
pub use scan::*;
pub use server::*;

use crate::config::Opts;
use crate::vector::Vector;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 读取 JSON 数组格式的向量文件
pub(crate) fn read_vector(path: impl AsRef<Path>) -> anyhow::Result<Vector> {
    let path = path.as_ref();
    let data = std::fs::read(path).with_context(|| format!("读取 {} 失败", path.display()))?;
    let vector = serde_json::from_slice(&data)
        .with_context(|| format!("{} 不是有效的向量", path.display()))?;
    Ok(vector)
}
