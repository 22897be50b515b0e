// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/operator/terminal.rs - 终端操作员输入
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

use std::io::{BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{debug, info, warn};

use crate::{
  frame::VideoFrame,
  model::BBox,
  operator::{
    BoxSelector, EventSource, InputEvent, KeyMap, OperatorError,
    shift::{self, ShiftReader, ShiftWriter},
  },
};

enum TerminalLine {
  Line(String),
  Interrupt,
  Closed,
}

/// 从终端逐行读取按键的操作员
///
/// 每行一个按键；单独一行 `shift` 或 `caps` 翻转 shift 状态。画框时输入
/// `x y w h`（左上角 + 宽高），输入 `c` 取消。
///
/// 监听线程每送出一行都等待主循环确认后才继续读取，shift 的翻转因此与
/// 按键保持输入顺序。
pub struct TerminalOperator {
  keymap: KeyMap,
  lines: Receiver<TerminalLine>,
  consumed: Sender<()>,
  shift: ShiftReader,
  quit_requested: bool,
}

impl TerminalOperator {
  /// 监听标准输入，并把 Ctrl-C 转换为退出事件
  pub fn stdin(keymap: KeyMap) -> Result<Self, OperatorError> {
    let (operator, tx) = Self::spawn(BufReader::new(std::io::stdin()), keymap);

    ctrlc::set_handler(move || {
      info!("收到中断信号，将在下一次暂停时退出");
      let _ = tx.send(TerminalLine::Interrupt);
    })?;

    Ok(operator)
  }

  /// 在独立线程中读取 `reader`
  pub fn from_reader<R: BufRead + Send + 'static>(reader: R, keymap: KeyMap) -> Self {
    Self::spawn(reader, keymap).0
  }

  fn spawn<R: BufRead + Send + 'static>(
    reader: R,
    keymap: KeyMap,
  ) -> (Self, Sender<TerminalLine>) {
    let (tx, rx) = mpsc::channel();
    let (consumed_tx, consumed_rx) = mpsc::channel();
    let (writer, reader_flag) = shift::latch();

    let listener_tx = tx.clone();
    thread::spawn(move || listen(reader, listener_tx, consumed_rx, writer));

    (
      TerminalOperator {
        keymap,
        lines: rx,
        consumed: consumed_tx,
        shift: reader_flag,
        quit_requested: false,
      },
      tx,
    )
  }
}

fn listen<R: BufRead>(
  reader: R,
  tx: Sender<TerminalLine>,
  consumed: Receiver<()>,
  shift: ShiftWriter,
) {
  for line in reader.lines() {
    let Ok(line) = line else {
      break;
    };
    let token = line.trim();
    if token.eq_ignore_ascii_case("shift") || token.eq_ignore_ascii_case("caps") {
      let active = shift.toggle();
      debug!("shift 状态: {}", active);
      continue;
    }
    if tx.send(TerminalLine::Line(token.to_string())).is_err() {
      return;
    }
    // 这一行处理完之前不读后面的 shift
    if consumed.recv().is_err() {
      return;
    }
  }
  let _ = tx.send(TerminalLine::Closed);
}

fn parse_box(text: &str) -> Option<BBox> {
  let values: Vec<i32> = text
    .split(|c: char| c.is_whitespace() || c == ',')
    .filter(|s| !s.is_empty())
    .map(str::parse)
    .collect::<Result<_, _>>()
    .ok()?;
  match values.as_slice() {
    [x, y, w, h] if *w > 0 && *h > 0 => Some(BBox::new(*x, *y, *w, *h)),
    _ => None,
  }
}

impl TerminalOperator {
  /// 通知监听线程当前行已处理完
  fn acknowledge(&self) {
    let _ = self.consumed.send(());
  }
}

impl EventSource for TerminalOperator {
  type Error = OperatorError;

  fn next_event(&mut self) -> Result<InputEvent, Self::Error> {
    if self.quit_requested {
      return Ok(InputEvent::Quit);
    }

    loop {
      match self.lines.recv() {
        Ok(TerminalLine::Line(line)) => {
          let Some(key) = line.chars().next() else {
            self.acknowledge();
            continue;
          };
          let shift_active = self.shift.is_active();
          let event = self.keymap.translate(key, shift_active);
          self.acknowledge();
          match event {
            Some(event) => return Ok(event),
            None => warn!("未识别的按键: {:?}", line),
          }
        }
        Ok(TerminalLine::Interrupt) => return Ok(InputEvent::Quit),
        Ok(TerminalLine::Closed) | Err(_) => {
          warn!("输入已关闭，结束会话");
          return Ok(InputEvent::Quit);
        }
      }
    }
  }
}

impl BoxSelector for TerminalOperator {
  type Error = OperatorError;

  fn select_box(&mut self, frame: &VideoFrame) -> Result<Option<BBox>, Self::Error> {
    println!(
      "第 {} 帧 ({}x{})：输入边框 x y w h，或 c 取消",
      frame.index,
      frame.width(),
      frame.height()
    );

    loop {
      match self.lines.recv() {
        Ok(TerminalLine::Line(line)) => {
          self.acknowledge();
          if line.eq_ignore_ascii_case("c") {
            return Ok(None);
          }
          match parse_box(&line) {
            Some(bbox) => return Ok(Some(bbox)),
            None => warn!("无法解析边框: {:?}", line),
          }
        }
        Ok(TerminalLine::Interrupt) | Ok(TerminalLine::Closed) | Err(_) => {
          self.quit_requested = true;
          return Ok(None);
        }
      }
    }
  }
}
