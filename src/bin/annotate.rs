// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/bin/annotate.rs - 逐帧标注程序
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
  annotation::{AnnotationWriter, default_annotation_path},
  input::{SourceWrapper, source_path},
  model::{CommandDetector, TemplateTracker},
  operator::{KeyMap, TerminalOperator},
  output::{OutputWrapper, default_preview_url, draw::Draw},
  task::{Annotator, SessionEnd},
};

/// 逐帧标注视频中的单个目标
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 视频：文件路径、图像序列目录，或 `frames://` / `gst://` URL
  #[arg(value_name = "VIDEO")]
  pub video: String,
  /// 标注文件路径，默认为视频旁的 `<名称>.annotations`
  #[arg(value_name = "OUTPUT")]
  pub output: Option<PathBuf>,
  /// 文本提示词，启用检测器辅助
  #[arg(long, value_name = "TEXT", requires = "detector_cmd")]
  pub prompt: Option<String>,
  /// 检测器程序，调用方式为 `<程序> [参数...] <图像> <提示词>`
  #[arg(long, value_name = "PROGRAM", requires = "prompt")]
  pub detector_cmd: Option<String>,
  /// 传给检测器的额外参数，可重复
  #[arg(long, value_name = "ARG")]
  pub detector_arg: Vec<String>,
  /// 低于该得分的候选框被丢弃
  #[arg(long, value_name = "SCORE", default_value_t = 0.0)]
  pub min_score: f32,
  /// 预览输出，默认写入临时目录下的 PNG
  #[arg(long, value_name = "URL")]
  pub display: Option<Url>,
  /// 叠加文字使用的字体文件
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
  /// 模板匹配的最大归一化误差，超过即视为跟踪失败
  #[arg(long, value_name = "F", default_value_t = 0.25)]
  pub match_threshold: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let annotation_path = args
    .output
    .clone()
    .unwrap_or_else(|| default_annotation_path(&source_path(&args.video)));
  let display_url = match args.display.clone() {
    Some(url) => url,
    None => default_preview_url()?,
  };

  info!("视频: {}", args.video);
  info!("标注文件: {}", annotation_path.display());
  info!("预览输出: {}", display_url);

  let source = SourceWrapper::open(&args.video)?;
  let draw = match args.font.as_deref() {
    Some(path) => Draw::with_font_file(path)?,
    None => Draw::default(),
  };
  let output = OutputWrapper::from_url(&display_url)?.with_draw(draw);
  let writer = AnnotationWriter::create(&annotation_path)?;
  let operator = TerminalOperator::stdin(KeyMap::Annotate)?;
  let tracker = TemplateTracker::new(args.match_threshold);

  let annotator = Annotator::new(source, tracker, output, operator, writer);
  let end = match (args.prompt, args.detector_cmd) {
    (Some(prompt), Some(program)) => {
      let detector = CommandDetector::new(program)
        .with_args(args.detector_arg)
        .with_min_score(args.min_score);
      annotator.with_prompt(detector, prompt).run()?
    }
    _ => annotator.run()?,
  };

  match end {
    SessionEnd::Quit => info!("标注已退出，记录保存在 {}", annotation_path.display()),
    SessionEnd::EndOfStream => info!("标注完成，记录保存在 {}", annotation_path.display()),
  }

  Ok(())
}
