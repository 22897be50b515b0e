// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/annotation/reader.rs - 标注记录读取
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

use std::path::Path;

use tracing::info;

use crate::annotation::{AnnotationError, AnnotationRecord, CenterBox, RecordKind};

const FIELD_COUNT: usize = 5;

/// 读取整个标注文件
pub fn read_annotations(path: &Path) -> Result<Vec<AnnotationRecord>, AnnotationError> {
  let text = std::fs::read_to_string(path)?;
  let records = parse_annotations(&text)?;
  info!("从 {} 读取 {} 条标注", path.display(), records.len());
  Ok(records)
}

/// 按行解析标注，行号从 1 开始报告；不检查帧序号是否连续
pub fn parse_annotations(text: &str) -> Result<Vec<AnnotationRecord>, AnnotationError> {
  text
    .lines()
    .enumerate()
    .map(|(i, line)| parse_line(i + 1, line))
    .collect()
}

fn parse_line(line_number: usize, line: &str) -> Result<AnnotationRecord, AnnotationError> {
  let fields: Vec<&str> = line.split_whitespace().collect();
  if fields.len() != FIELD_COUNT {
    return Err(AnnotationError::Parse {
      line: line_number,
      reason: format!("期望 {} 个字段, 实际 {} 个", FIELD_COUNT, fields.len()),
    });
  }

  let kind = RecordKind::from_code(fields[0]).ok_or_else(|| AnnotationError::Parse {
    line: line_number,
    reason: format!("未知的记录类型 {:?}", fields[0]),
  })?;

  let mut geometry = [0i32; 4];
  for (slot, field) in geometry.iter_mut().zip(&fields[1..]) {
    *slot = field.parse().map_err(|_| AnnotationError::Parse {
      line: line_number,
      reason: format!("几何字段不是整数: {:?}", field),
    })?;
  }

  Ok(match kind {
    RecordKind::Visible => AnnotationRecord::Visible(CenterBox {
      center_x: geometry[0],
      center_y: geometry[1],
      width: geometry[2],
      height: geometry[3],
    }),
    RecordKind::Skipped => AnnotationRecord::Skipped,
    RecordKind::Invisible => AnnotationRecord::Invisible,
  })
}
