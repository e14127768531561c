use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::task::block_in_place;
use walkdir::WalkDir;

use crate::address::{Address, AddressDeriver};
use crate::cli::SubCommandExtend;
use crate::config::{AddressOptions, Opts, OutputFormat};
use crate::fingerprint::{Digest, Fingerprint};
use crate::vector::Vector;

#[derive(Parser, Debug, Clone)]
pub struct ScanCommand {
    #[command(flatten)]
    pub address: AddressOptions,
    /// 提交文件所在目录，每个文件包含 `imageVector` 和 `textVector`
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "json")]
    pub suffix: String,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

/// 单个提交文件
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanItem {
    image_vector: Vector,
    text_vector: Vector,
    #[serde(default)]
    seed: Option<String>,
}

/// 推导到同一地址的一组提交
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub address: Address,
    pub bump: u8,
    pub combined_hash: Digest,
    pub files: Vec<String>,
}

impl SubCommandExtend for ScanCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let re_suf = format!("(?i)^({})$", self.suffix.replace(',', "|"));
        let re_suf = Regex::new(&re_suf).context("无效的后缀")?;
        let deriver = self.address.deriver()?;

        let entries = collect_entries(&self.path, &re_suf);
        info!("扫描完成，共 {} 个提交", entries.len());

        let groups = block_in_place(|| find_duplicates(&deriver, &entries));
        info!("发现 {} 组重复提交", groups.len());

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&groups)?),
            OutputFormat::Table => {
                for group in &groups {
                    for file in &group.files {
                        println!("{}\t{}", group.address, file);
                    }
                }
            }
        }
        Ok(())
    }
}

fn collect_entries(path: &Path, re_suf: &Regex) -> Vec<PathBuf> {
    let mut entries = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|ext| re_suf.is_match(&ext.to_string_lossy()))
        })
        .collect::<Vec<_>>();
    entries.sort();
    entries
}

/// 并行计算指纹和地址，按地址分组，返回包含多个文件的组
pub fn find_duplicates(deriver: &AddressDeriver, entries: &[PathBuf]) -> Vec<DuplicateGroup> {
    let pb = ProgressBar::new(entries.len() as u64).with_style(pb_style());

    let results = entries
        .par_iter()
        .progress_with(pb.clone())
        .filter_map(|path| match fingerprint_file(deriver, path) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("跳过 {}: {e:#}", path.display());
                None
            }
        })
        .collect::<Vec<_>>();

    pb.finish_and_clear();

    let mut by_address: BTreeMap<Address, DuplicateGroup> = BTreeMap::new();
    for (path, address, bump, combined_hash) in results {
        by_address
            .entry(address)
            .or_insert_with(|| DuplicateGroup { address, bump, combined_hash, files: vec![] })
            .files
            .push(path);
    }

    by_address
        .into_values()
        .filter(|group| group.files.len() > 1)
        .map(|mut group| {
            group.files.sort();
            group
        })
        .collect()
}

fn fingerprint_file(deriver: &AddressDeriver, path: &Path) -> Result<(String, Address, u8, Digest)> {
    let data = std::fs::read(path)?;
    let item: ScanItem = serde_json::from_slice(&data)?;
    let fingerprint = Fingerprint::compute(&item.image_vector, &item.text_vector).fingerprint;
    let derived = deriver.derive_with_seed(&fingerprint.combined, item.seed.as_deref())?;
    Ok((path.to_string_lossy().to_string(), derived.address, derived.bump, fingerprint.combined))
}

fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .expect("progress template is valid")
}
