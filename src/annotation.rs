// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/annotation.rs - 标注记录定义
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

//! # 标注文件格式
//!
//! 每帧一行，字段以空格分隔：
//!
//! ```text
//! <KIND> <center_x> <center_y> <width> <height>
//! ```
//!
//! `KIND` 为 `V`（可见）、`S`（跳过）或 `I`（不可见）。`S` 与 `I` 的几何字段固定为
//! `-1 -1 -1 -1`。文件没有表头，每行以换行结尾。

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::BBox;

mod reader;
mod writer;

pub use self::reader::{parse_annotations, read_annotations};
pub use self::writer::{AnnotationWriter, SyncWrite};

pub const ANNOTATION_EXTENSION: &str = "annotations";

const SENTINEL: i32 = -1;

#[derive(Error, Debug)]
pub enum AnnotationError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("第 {line} 行格式错误: {reason}")]
  Parse { line: usize, reason: String },
  #[error("记录顺序错误: 期望第 {expected} 帧, 实际第 {actual} 帧")]
  OutOfOrder { expected: usize, actual: usize },
}

/// 中心点 + 宽高表示的边框
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CenterBox {
  pub center_x: i32,
  pub center_y: i32,
  pub width: i32,
  pub height: i32,
}

impl From<BBox> for CenterBox {
  fn from(bbox: BBox) -> Self {
    CenterBox {
      center_x: bbox.x + bbox.width.div_euclid(2),
      center_y: bbox.y + bbox.height.div_euclid(2),
      width: bbox.width,
      height: bbox.height,
    }
  }
}

impl From<CenterBox> for BBox {
  fn from(center: CenterBox) -> Self {
    BBox::new(
      center.center_x - center.width.div_euclid(2),
      center.center_y - center.height.div_euclid(2),
      center.width,
      center.height,
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
  Visible,
  Skipped,
  Invisible,
}

impl RecordKind {
  pub fn code(&self) -> char {
    match self {
      RecordKind::Visible => 'V',
      RecordKind::Skipped => 'S',
      RecordKind::Invisible => 'I',
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code {
      "V" => Some(RecordKind::Visible),
      "S" => Some(RecordKind::Skipped),
      "I" => Some(RecordKind::Invisible),
      _ => None,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      RecordKind::Visible => "Visible",
      RecordKind::Skipped => "Skipped",
      RecordKind::Invisible => "Invisible",
    }
  }
}

/// 单帧的标注结果，一经写入不再修改
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationRecord {
  Visible(CenterBox),
  Skipped,
  Invisible,
}

impl AnnotationRecord {
  pub fn visible(bbox: BBox) -> Self {
    AnnotationRecord::Visible(CenterBox::from(bbox))
  }

  pub fn kind(&self) -> RecordKind {
    match self {
      AnnotationRecord::Visible(_) => RecordKind::Visible,
      AnnotationRecord::Skipped => RecordKind::Skipped,
      AnnotationRecord::Invisible => RecordKind::Invisible,
    }
  }

  pub fn geometry(&self) -> [i32; 4] {
    match self {
      AnnotationRecord::Visible(c) => [c.center_x, c.center_y, c.width, c.height],
      AnnotationRecord::Skipped | AnnotationRecord::Invisible => [SENTINEL; 4],
    }
  }

  pub fn bbox(&self) -> Option<BBox> {
    match self {
      AnnotationRecord::Visible(c) => Some(BBox::from(*c)),
      _ => None,
    }
  }
}

impl fmt::Display for AnnotationRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let [a, b, c, d] = self.geometry();
    write!(f, "{} {} {} {} {}", self.kind().code(), a, b, c, d)
  }
}

/// 视频旁边的默认标注文件路径：`<目录>/<文件名去扩展名>.annotations`
pub fn default_annotation_path(video: &Path) -> PathBuf {
  let stem = video
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "video".to_string());
  let directory = video.parent().unwrap_or_else(|| Path::new(""));
  directory.join(format!("{}.{}", stem, ANNOTATION_EXTENSION))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn visible_record_uses_center() {
    let record = AnnotationRecord::visible(BBox::new(10, 10, 20, 20));
    assert_eq!(record.to_string(), "V 20 20 20 20");
  }

  #[test]
  fn odd_sizes_floor_half() {
    let record = AnnotationRecord::visible(BBox::new(3, 4, 7, 9));
    assert_eq!(record.to_string(), "V 6 8 7 9");
  }

  #[test]
  fn absent_records_carry_sentinel() {
    assert_eq!(AnnotationRecord::Skipped.to_string(), "S -1 -1 -1 -1");
    assert_eq!(AnnotationRecord::Invisible.to_string(), "I -1 -1 -1 -1");
    assert_eq!(AnnotationRecord::Skipped.bbox(), None);
  }

  #[test]
  fn center_box_back_to_corner() {
    let bbox = BBox::new(3, 4, 8, 10);
    assert_eq!(AnnotationRecord::visible(bbox).bbox(), Some(bbox));
  }

  #[test]
  fn default_path_sits_beside_video() {
    assert_eq!(
      default_annotation_path(Path::new("/data/clips/walk.mp4")),
      PathBuf::from("/data/clips/walk.annotations")
    );
    assert_eq!(
      default_annotation_path(Path::new("walk.mp4")),
      PathBuf::from("walk.annotations")
    );
    assert_eq!(
      default_annotation_path(Path::new("/data/frames/")),
      PathBuf::from("/data/frames.annotations")
    );
  }
}
