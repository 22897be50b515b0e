// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/annotation/writer.rs - 标注记录写入
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

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::annotation::{AnnotationError, AnnotationRecord};

/// 写入后可落盘的输出
pub trait SyncWrite: Write {
  fn sync(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

impl SyncWrite for File {
  fn sync(&mut self) -> std::io::Result<()> {
    self.sync_data()
  }
}

impl SyncWrite for Vec<u8> {}

/// 只追加的标注写入器
///
/// 每次 `append` 完整写入一行并落盘后才返回；帧序号必须等于已写入的记录数。
pub struct AnnotationWriter<W: SyncWrite> {
  inner: W,
  written: usize,
}

impl AnnotationWriter<File> {
  /// 以截断模式创建标注文件，原有内容被丢弃
  pub fn create(path: &Path) -> Result<Self, AnnotationError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    info!("标注文件已创建: {}", path.display());
    Ok(Self::new(file))
  }
}

impl<W: SyncWrite> AnnotationWriter<W> {
  pub fn new(inner: W) -> Self {
    Self { inner, written: 0 }
  }

  /// 已写入的记录数，也是下一条记录的帧序号
  pub fn written(&self) -> usize {
    self.written
  }

  pub fn append(
    &mut self,
    frame_number: usize,
    record: &AnnotationRecord,
  ) -> Result<(), AnnotationError> {
    if frame_number != self.written {
      return Err(AnnotationError::OutOfOrder {
        expected: self.written,
        actual: frame_number,
      });
    }

    let line = format!("{}\n", record);
    self.inner.write_all(line.as_bytes())?;
    self.inner.flush()?;
    self.inner.sync()?;
    self.written += 1;

    debug!("第 {} 帧记录: {}", frame_number, record);
    Ok(())
  }

  pub fn into_inner(self) -> W {
    self.inner
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BBox;
  use assert_matches::assert_matches;

  #[test]
  fn appends_lines_in_order() {
    let mut writer = AnnotationWriter::new(Vec::new());
    writer
      .append(0, &AnnotationRecord::visible(BBox::new(10, 10, 20, 20)))
      .unwrap();
    writer.append(1, &AnnotationRecord::Skipped).unwrap();
    writer.append(2, &AnnotationRecord::Invisible).unwrap();
    assert_eq!(writer.written(), 3);

    let text = String::from_utf8(writer.into_inner()).unwrap();
    assert_eq!(text, "V 20 20 20 20\nS -1 -1 -1 -1\nI -1 -1 -1 -1\n");
  }

  #[test]
  fn refuses_gaps_and_duplicates() {
    let mut writer = AnnotationWriter::new(Vec::new());
    writer.append(0, &AnnotationRecord::Skipped).unwrap();
    assert_matches!(
      writer.append(0, &AnnotationRecord::Skipped),
      Err(AnnotationError::OutOfOrder {
        expected: 1,
        actual: 0
      })
    );
    assert_matches!(
      writer.append(2, &AnnotationRecord::Skipped),
      Err(AnnotationError::OutOfOrder {
        expected: 1,
        actual: 2
      })
    );
    assert_eq!(writer.into_inner(), b"S -1 -1 -1 -1\n".to_vec());
  }

  #[test]
  fn create_truncates_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.annotations");
    std::fs::write(&path, "V 1 1 1 1\nV 2 2 2 2\n").unwrap();

    let mut writer = AnnotationWriter::create(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

    writer.append(0, &AnnotationRecord::Invisible).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "I -1 -1 -1 -1\n");
  }
}
