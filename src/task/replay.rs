// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/task/replay.rs - 回放已有标注
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
use tracing::{debug, info};

use crate::{
  annotation::AnnotationRecord,
  input::FrameSource,
  operator::{EventSource, InputEvent},
  output::{BoxStyle, Overlay, Render},
  task::SessionEnd,
};

pub const REPLAY_OPTIONS: [&str; 5] = [
  "n : Next Frame",
  "N : Forward 10 Frames",
  "p : Previous Frame",
  "P : Back 10 Frames",
  "q : Quit",
];

const JUMP: usize = 10;

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("标注记录过短: 视频存在第 {frame} 帧, 但只有 {records} 条记录")]
  RecordTooShort { frame: usize, records: usize },
}

/// 回放时的叠加层，只由记录和帧号决定
pub fn replay_overlay(record: &AnnotationRecord, frame_number: usize) -> Overlay {
  let overlay = Overlay::new(&REPLAY_OPTIONS, frame_number);
  match record.bbox() {
    Some(bbox) => overlay.with_box(bbox, BoxStyle::Annotation),
    None => overlay.with_status(record.kind().label()),
  }
}

/// 按帧浏览已写好的标注，不写入任何内容
pub struct Replayer<S, O, E> {
  source: S,
  output: O,
  operator: E,
  records: Vec<AnnotationRecord>,
  frame_number: usize,
}

impl<S, O, E> Replayer<S, O, E>
where
  S: FrameSource,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
  E: EventSource,
  E::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(source: S, output: O, operator: E, records: Vec<AnnotationRecord>) -> Self {
    Self {
      source,
      output,
      operator,
      records,
      frame_number: 0,
    }
  }

  pub fn run(mut self) -> anyhow::Result<SessionEnd> {
    info!("开始回放，共 {} 条记录", self.records.len());

    loop {
      debug!("定位到第 {} 帧", self.frame_number);
      let Some(frame) = self.source.seek(self.frame_number)? else {
        info!("已到达视频末尾（第 {} 帧）", self.frame_number);
        return Ok(SessionEnd::EndOfStream);
      };

      let record = self
        .records
        .get(self.frame_number)
        .ok_or(ReplayError::RecordTooShort {
          frame: self.frame_number,
          records: self.records.len(),
        })?;
      self
        .output
        .render_result(&frame, &replay_overlay(record, self.frame_number))?;

      match self.next_target()? {
        Some(target) => self.frame_number = target,
        None => {
          info!("操作员退出回放，停在第 {} 帧", self.frame_number);
          return Ok(SessionEnd::Quit);
        }
      }
    }
  }

  /// 等待一个导航事件，返回新的帧号；`None` 表示退出
  fn next_target(&mut self) -> anyhow::Result<Option<usize>> {
    loop {
      let target = match self.operator.next_event()? {
        InputEvent::NavNext => self.frame_number + 1,
        InputEvent::NavJumpForward => self.frame_number + JUMP,
        InputEvent::NavPrev => self.frame_number.saturating_sub(1),
        InputEvent::NavJumpBack => self.frame_number.saturating_sub(JUMP),
        InputEvent::Quit => return Ok(None),
        event => {
          debug!("回放时忽略事件 {:?}", event);
          continue;
        }
      };
      return Ok(Some(target));
    }
  }
}
