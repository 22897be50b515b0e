// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/operator.rs - 操作员输入
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

use thiserror::Error;

use crate::{frame::VideoFrame, model::BBox};

pub mod shift;
mod terminal;

pub use self::terminal::TerminalOperator;

/// 状态机能理解的全部输入事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
  Label,
  Skip,
  Invisible,
  Accept,
  Fix,
  Rerun,
  Quit,
  NavNext,
  NavPrev,
  NavJumpForward,
  NavJumpBack,
}

#[derive(Error, Debug)]
pub enum OperatorError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无法设置 Ctrl-C 处理: {0}")]
  CtrlC(#[from] ctrlc::Error),
}

/// 每次暂停时阻塞等待一个事件
pub trait EventSource {
  type Error;
  fn next_event(&mut self) -> Result<InputEvent, Self::Error>;
}

/// 由操作员在当前帧上画框，取消时返回 `None`
pub trait BoxSelector {
  type Error;
  fn select_box(&mut self, frame: &VideoFrame) -> Result<Option<BBox>, Self::Error>;
}

/// 原始按键到事件的映射
///
/// 按键的大小写由字符本身与 shift/caps 状态共同决定：二者恰有一个为真时视为大写。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMap {
  /// 标注：不区分大小写
  Annotate,
  /// 回放：`n`/`N` 与 `p`/`P` 含义不同
  Replay,
}

impl KeyMap {
  pub fn translate(&self, key: char, shift_active: bool) -> Option<InputEvent> {
    let upper = key.is_ascii_uppercase() != shift_active;
    let key = key.to_ascii_lowercase();
    match self {
      KeyMap::Annotate => match key {
        'l' => Some(InputEvent::Label),
        's' => Some(InputEvent::Skip),
        'i' => Some(InputEvent::Invisible),
        'a' => Some(InputEvent::Accept),
        'f' => Some(InputEvent::Fix),
        'r' => Some(InputEvent::Rerun),
        'q' => Some(InputEvent::Quit),
        _ => None,
      },
      KeyMap::Replay => match (key, upper) {
        ('n', false) => Some(InputEvent::NavNext),
        ('n', true) => Some(InputEvent::NavJumpForward),
        ('p', false) => Some(InputEvent::NavPrev),
        ('p', true) => Some(InputEvent::NavJumpBack),
        ('q', _) => Some(InputEvent::Quit),
        _ => None,
      },
    }
  }
}
