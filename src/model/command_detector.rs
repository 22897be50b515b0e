// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/model/command_detector.rs - 外部程序提示词检测器
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

//! # 外部程序检测器
//!
//! 将当前帧写入临时 PNG 文件，然后调用
//! `<program> [args...] <image> <prompt>`，从标准输出读取 JSON 结果：
//!
//! - `null` 或 `[]`：没有候选框
//! - `{"bbox": [x, y, w, h], "score": 0.9}`：单个候选框（左上角 + 宽高，像素）
//! - 由上述对象组成的数组：取得分最高者
//!
//! 得分低于 `min_score` 的候选框被丢弃。

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Local;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  frame::VideoFrame,
  model::{BBox, Candidate, PromptDetector},
};

#[derive(Error, Debug)]
pub enum CommandDetectorError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("检测程序退出状态异常: {status}: {stderr}")]
  CommandFailed { status: String, stderr: String },
  #[error("检测结果不是合法的 JSON: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("检测结果格式错误: {0}")]
  MalformedOutput(String),
}

pub struct CommandDetector {
  program: String,
  args: Vec<String>,
  scratch_dir: PathBuf,
  min_score: f32,
  calls: AtomicU32,
}

impl CommandDetector {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      scratch_dir: std::env::temp_dir(),
      min_score: 0.0,
      calls: AtomicU32::new(0),
    }
  }

  pub fn with_args(mut self, args: Vec<String>) -> Self {
    self.args = args;
    self
  }

  pub fn with_min_score(mut self, min_score: f32) -> Self {
    self.min_score = min_score;
    self
  }

  pub fn with_scratch_dir(mut self, scratch_dir: PathBuf) -> Self {
    self.scratch_dir = scratch_dir;
    self
  }

  fn scratch_path(&self, frame: &VideoFrame) -> PathBuf {
    let call = self.calls.fetch_add(1, Ordering::Relaxed);
    self.scratch_dir.join(format!(
      "zhenbiao-{}-{:06}-{:04X}.png",
      Local::now().format("%H-%M-%S"),
      frame.index,
      call
    ))
  }

  /// 解析检测程序输出，返回得分最高且不低于阈值的候选框
  pub fn parse_output(&self, stdout: &str) -> Result<Option<Candidate>, CommandDetectorError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
      return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed)?;
    let items = match value {
      Value::Null => Vec::new(),
      Value::Array(items) => items,
      object @ Value::Object(_) => vec![object],
      other => {
        return Err(CommandDetectorError::MalformedOutput(format!(
          "期望对象或数组，实际为 {}",
          other
        )));
      }
    };

    let mut best: Option<Candidate> = None;
    for item in items.iter() {
      let candidate = parse_candidate(item)?;
      if candidate.score < self.min_score || candidate.bbox.is_empty() {
        debug!("丢弃候选框 {:?}", candidate);
        continue;
      }
      if best.is_none_or(|b| candidate.score > b.score) {
        best = Some(candidate);
      }
    }
    Ok(best)
  }
}

fn parse_candidate(item: &Value) -> Result<Candidate, CommandDetectorError> {
  let bbox = item
    .get("bbox")
    .and_then(Value::as_array)
    .ok_or_else(|| CommandDetectorError::MalformedOutput("缺少 bbox 数组".to_string()))?;
  if bbox.len() != 4 {
    return Err(CommandDetectorError::MalformedOutput(format!(
      "bbox 需要 4 个数值，实际 {} 个",
      bbox.len()
    )));
  }

  let mut values = [0i32; 4];
  for (slot, v) in values.iter_mut().zip(bbox.iter()) {
    let number = v
      .as_f64()
      .ok_or_else(|| CommandDetectorError::MalformedOutput(format!("bbox 含非数值: {}", v)))?;
    *slot = number.round() as i32;
  }

  let score = item.get("score").and_then(Value::as_f64).unwrap_or(1.0) as f32;

  Ok(Candidate {
    bbox: BBox::new(values[0], values[1], values[2], values[3]),
    score,
  })
}

impl PromptDetector for CommandDetector {
  type Error = CommandDetectorError;

  fn detect(&self, frame: &VideoFrame, prompt: &str) -> Result<Option<Candidate>, Self::Error> {
    let path = self.scratch_path(frame);
    frame.image.save(&path)?;

    info!("运行检测程序 {} (提示词: {:?})", self.program, prompt);
    let output = Command::new(&self.program)
      .args(&self.args)
      .arg(&path)
      .arg(prompt)
      .output();

    if let Err(e) = std::fs::remove_file(&path) {
      warn!("无法删除临时文件 {}: {}", path.display(), e);
    }

    let output = output?;
    if !output.status.success() {
      return Err(CommandDetectorError::CommandFailed {
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    self.parse_output(&String::from_utf8_lossy(&output.stdout))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_matches::assert_matches;

  #[test]
  fn null_and_empty_mean_no_candidate() {
    let detector = CommandDetector::new("true");
    assert_eq!(detector.parse_output("null").unwrap(), None);
    assert_eq!(detector.parse_output("  \n").unwrap(), None);
    assert_eq!(detector.parse_output("[]").unwrap(), None);
  }

  #[test]
  fn single_object_is_parsed() {
    let detector = CommandDetector::new("true");
    let candidate = detector
      .parse_output(r#"{"bbox": [10, 12.4, 20, 30.6], "score": 0.8}"#)
      .unwrap()
      .unwrap();
    assert_eq!(candidate.bbox, BBox::new(10, 12, 20, 31));
    assert!((candidate.score - 0.8).abs() < 1e-6);
  }

  #[test]
  fn highest_score_above_threshold_wins() {
    let detector = CommandDetector::new("true").with_min_score(0.5);
    let output = r#"[
      {"bbox": [0, 0, 5, 5], "score": 0.4},
      {"bbox": [1, 1, 5, 5], "score": 0.7},
      {"bbox": [2, 2, 5, 5], "score": 0.6}
    ]"#;
    let candidate = detector.parse_output(output).unwrap().unwrap();
    assert_eq!(candidate.bbox, BBox::new(1, 1, 5, 5));

    let low = r#"[{"bbox": [0, 0, 5, 5], "score": 0.4}]"#;
    assert_eq!(detector.parse_output(low).unwrap(), None);
  }

  #[test]
  fn malformed_output_is_an_error() {
    let detector = CommandDetector::new("true");
    assert_matches!(
      detector.parse_output(r#"{"bbox": [1, 2, 3]}"#),
      Err(CommandDetectorError::MalformedOutput(_))
    );
    assert_matches!(
      detector.parse_output("not json"),
      Err(CommandDetectorError::JsonError(_))
    );
    assert_matches!(
      detector.parse_output("42"),
      Err(CommandDetectorError::MalformedOutput(_))
    );
  }
}
