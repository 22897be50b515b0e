// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/bin/replay.rs - 标注回放程序
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use zhenbiao::{
  FromUrl,
  annotation::{default_annotation_path, read_annotations},
  input::{SourceWrapper, source_path},
  operator::{KeyMap, TerminalOperator},
  output::{OutputWrapper, default_preview_url, draw::Draw},
  task::{Replayer, SessionEnd},
};

/// 在视频上回放已有的标注文件
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 视频：文件路径、图像序列目录，或 `frames://` / `gst://` URL
  #[arg(value_name = "VIDEO")]
  pub video: String,
  /// 标注文件路径，默认为视频旁的 `<名称>.annotations`
  #[arg(value_name = "ANNOTATIONS")]
  pub annotations: Option<PathBuf>,
  /// 预览输出，默认写入临时目录下的 PNG
  #[arg(long, value_name = "URL")]
  pub display: Option<Url>,
  /// 叠加文字使用的字体文件
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let annotation_path = args
    .annotations
    .clone()
    .unwrap_or_else(|| default_annotation_path(&source_path(&args.video)));
  let display_url = match args.display.clone() {
    Some(url) => url,
    None => default_preview_url()?,
  };

  info!("视频: {}", args.video);
  info!("标注文件: {}", annotation_path.display());
  info!("预览输出: {}", display_url);

  let records = read_annotations(&annotation_path)?;
  let source = SourceWrapper::open(&args.video)?;
  let draw = match args.font.as_deref() {
    Some(path) => Draw::with_font_file(path)?,
    None => Draw::default(),
  };
  let output = OutputWrapper::from_url(&display_url)?.with_draw(draw);
  let operator = TerminalOperator::stdin(KeyMap::Replay)?;

  match Replayer::new(source, output, operator, records).run()? {
    SessionEnd::Quit => info!("回放已退出"),
    SessionEnd::EndOfStream => info!("回放到达视频末尾"),
  }

  Ok(())
}
