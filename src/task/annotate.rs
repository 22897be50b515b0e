// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/task/annotate.rs - 标注任务驱动
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

use std::fmt::Display;

use tracing::{debug, info, warn};

use crate::{
  annotation::{AnnotationWriter, SyncWrite},
  frame::VideoFrame,
  input::FrameSource,
  model::{Candidate, PromptDetector, Tracker},
  operator::{BoxSelector, EventSource},
  output::Render,
  task::{
    SessionEnd,
    session::{Action, Observation, Probe, Session},
  },
};

/// 逐帧标注任务
///
/// 每前进一帧只解码一次；一次暂停内可以处理多个被忽略的事件、取消的画框
/// 和重新检测，直到写入一条记录或退出。
pub struct Annotator<S, T, D, O, E, W: SyncWrite> {
  source: S,
  tracker: T,
  prompt: Option<(D, String)>,
  output: O,
  operator: E,
  writer: AnnotationWriter<W>,
  session: Session,
}

impl<S, T, D, O, E, W> Annotator<S, T, D, O, E, W>
where
  S: FrameSource,
  T: Tracker,
  D: PromptDetector,
  D::Error: Display,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
  E: EventSource + BoxSelector,
  <E as EventSource>::Error: std::error::Error + Send + Sync + 'static,
  <E as BoxSelector>::Error: std::error::Error + Send + Sync + 'static,
  W: SyncWrite,
{
  pub fn new(source: S, tracker: T, output: O, operator: E, writer: AnnotationWriter<W>) -> Self {
    Self {
      source,
      tracker,
      prompt: None,
      output,
      operator,
      writer,
      session: Session::new(false),
    }
  }

  /// 启用提示词检测：跟踪器未建立时，每帧先用检测器给出候选框
  pub fn with_prompt(mut self, detector: D, prompt: impl Into<String>) -> Self {
    self.prompt = Some((detector, prompt.into()));
    self.session = Session::new(true);
    self
  }

  pub fn run(mut self) -> anyhow::Result<SessionEnd> {
    info!("开始标注...");
    if let Some((_, prompt)) = self.prompt.as_ref() {
      info!("提示词: {:?}", prompt);
    }

    loop {
      let Some(frame) = self.source.next_frame()? else {
        info!("视频结束，共写入 {} 条记录", self.writer.written());
        return Ok(SessionEnd::EndOfStream);
      };
      debug!("解码第 {} 帧", self.session.frame_number());

      let observation = match self.session.probe() {
        Probe::Track => {
          let tracked = self.tracker.update(&frame);
          if tracked.is_none() {
            warn!("第 {} 帧跟踪失败", self.session.frame_number());
          }
          Observation::Tracked(tracked)
        }
        Probe::Detect => Observation::Detected(self.detect(&frame)),
        Probe::Nothing => Observation::Nothing,
      };
      self.session.present(observation);

      if self.pause(&frame)? {
        info!(
          "操作员退出，停在第 {} 帧，共写入 {} 条记录",
          self.session.frame_number(),
          self.writer.written()
        );
        return Ok(SessionEnd::Quit);
      }
    }
  }

  /// 处理一次暂停，返回 `true` 表示退出
  fn pause(&mut self, frame: &VideoFrame) -> anyhow::Result<bool> {
    loop {
      self.output.render_result(frame, &self.session.overlay())?;
      let event = self.operator.next_event()?;

      let mut action = self.session.decide(event);
      if action == Action::DrawBox {
        self
          .output
          .render_result(frame, &self.session.drawing_overlay())?;
        action = match self.operator.select_box(frame)? {
          Some(bbox) => self.session.drawn(bbox),
          None => {
            info!("取消画框");
            continue;
          }
        };
      }

      match action {
        Action::Ignore | Action::DrawBox => {
          debug!("{:?} 模式下忽略事件 {:?}", self.session.mode(), event);
        }
        Action::Quit => return Ok(true),
        Action::Rerun => {
          let frame_copy = frame.clone();
          let candidate = self.detect(&frame_copy);
          self.session.replace_candidate(candidate);
        }
        Action::Commit {
          record,
          init_tracker,
        } => {
          if let Some(bbox) = init_tracker {
            info!("以 {:?} 初始化跟踪器", bbox);
            self.tracker.init(frame, bbox);
          }
          let frame_number = self.session.frame_number();
          self.writer.append(frame_number, &record)?;
          info!("第 {} 帧: {}", frame_number, record.kind().label());
          self.session.advance(init_tracker.is_some());
          return Ok(false);
        }
      }
    }
  }

  fn detect(&self, frame: &VideoFrame) -> Option<Candidate> {
    let (detector, prompt) = self.prompt.as_ref()?;
    let now = std::time::Instant::now();
    match detector.detect(frame, prompt) {
      Ok(candidate) => {
        info!(
          "检测完成，耗时: {:.2?}，候选框: {:?}",
          now.elapsed(),
          candidate
        );
        candidate
      }
      Err(e) => {
        warn!("检测失败: {}", e);
        None
      }
    }
  }
}
