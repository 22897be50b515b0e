// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/operator/shift.rs - shift/caps 状态
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

//! 监听线程与主循环之间唯一共享的状态：一个原子布尔量。
//! 写端与读端各只有一个，均不可克隆。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ShiftWriter(Arc<AtomicBool>);

pub struct ShiftReader(Arc<AtomicBool>);

pub fn latch() -> (ShiftWriter, ShiftReader) {
  let flag = Arc::new(AtomicBool::new(false));
  (ShiftWriter(flag.clone()), ShiftReader(flag))
}

impl ShiftWriter {
  /// 翻转状态，返回翻转后的值
  pub fn toggle(&self) -> bool {
    !self.0.fetch_xor(true, Ordering::AcqRel)
  }

  pub fn set(&self, active: bool) {
    self.0.store(active, Ordering::Release);
  }
}

impl ShiftReader {
  pub fn is_active(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn toggle_flips_state() {
    let (writer, reader) = latch();
    assert!(!reader.is_active());
    assert!(writer.toggle());
    assert!(reader.is_active());
    assert!(!writer.toggle());
    assert!(!reader.is_active());
    writer.set(true);
    assert!(reader.is_active());
  }

  #[test]
  fn writer_thread_is_visible_to_reader() {
    let (writer, reader) = latch();
    let handle = std::thread::spawn(move || {
      writer.toggle();
      writer
    });
    let _writer = handle.join().unwrap();
    assert!(reader.is_active());
  }
}
