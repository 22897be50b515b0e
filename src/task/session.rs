// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/task/session.rs - 标注会话状态机
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

//! # 标注会话状态机
//!
//! 这里只有纯状态转移，不做任何 I/O。每次暂停的流程：
//!
//! 1. [`Session::probe`] 决定本次暂停要调用哪种能力（跟踪、检测或都不调用）；
//! 2. 把调用结果交给 [`Session::present`]，得到本次暂停的模式与预测；
//! 3. 每个输入事件经 [`Session::decide`] 转换为 [`Action`]，由驱动方执行；
//! 4. 记录写入后调用 [`Session::advance`] 前进一帧。

use tracing::debug;

use crate::{
  annotation::AnnotationRecord,
  model::{BBox, Candidate},
  operator::InputEvent,
  output::{BoxStyle, Overlay},
};

pub const IDLE_OPTIONS: [&str; 4] = ["L/l : Label", "S/s : Skip", "I/i : Invisible", "Q/q : Quit"];

pub const TRACKING_OPTIONS: [&str; 5] = [
  "A/a : Accept",
  "F/f : Fix",
  "S/s : Skip",
  "I/i : Invisible",
  "Q/q : Quit",
];

pub const PROMPT_OPTIONS: [&str; 6] = [
  "A/a : Accept",
  "F/f : Fix",
  "R/r : Rerun",
  "S/s : Skip",
  "I/i : Invisible",
  "Q/q : Quit",
];

pub const PROMPT_EMPTY_OPTIONS: [&str; 5] = [
  "L/l : Label",
  "R/r : Rerun",
  "S/s : Skip",
  "I/i : Invisible",
  "Q/q : Quit",
];

pub const DRAWING_OPTIONS: [&str; 2] = ["x y w h : Accept", "C/c : Cancel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Idle,
  Tracking,
  PromptPending,
}

/// 本次暂停展示给操作员的预测
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
  Tracker(BBox),
  Prompt(Option<Candidate>),
}

/// 暂停开始时需要调用的能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
  Track,
  Detect,
  Nothing,
}

/// 能力调用的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
  Tracked(Option<BBox>),
  Detected(Option<Candidate>),
  Nothing,
}

/// 驱动方需要执行的动作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
  /// 事件在当前模式下不合法
  Ignore,
  Quit,
  /// 在当前帧的干净副本上重新检测，不前进
  Rerun,
  /// 请操作员画框，结果交给 [`Session::drawn`]
  DrawBox,
  /// 写入记录后前进；`init_tracker` 为 `Some` 时先以该框初始化跟踪器
  Commit {
    record: AnnotationRecord,
    init_tracker: Option<BBox>,
  },
}

#[derive(Debug)]
pub struct Session {
  frame_number: usize,
  mode: Mode,
  pending: Option<Prediction>,
  tracker_armed: bool,
  prompt_enabled: bool,
}

impl Session {
  pub fn new(prompt_enabled: bool) -> Self {
    Self {
      frame_number: 0,
      mode: Mode::Idle,
      pending: None,
      tracker_armed: false,
      prompt_enabled,
    }
  }

  pub fn frame_number(&self) -> usize {
    self.frame_number
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn pending(&self) -> Option<Prediction> {
    self.pending
  }

  pub fn tracker_armed(&self) -> bool {
    self.tracker_armed
  }

  pub fn probe(&self) -> Probe {
    if self.tracker_armed {
      Probe::Track
    } else if self.prompt_enabled {
      Probe::Detect
    } else {
      Probe::Nothing
    }
  }

  /// 根据能力调用结果设定本次暂停的模式与预测
  pub fn present(&mut self, observation: Observation) {
    let (mode, pending) = match observation {
      Observation::Tracked(Some(bbox)) => (Mode::Tracking, Some(Prediction::Tracker(bbox))),
      // 跟踪失败只影响本次暂停
      Observation::Tracked(None) => (Mode::Idle, None),
      Observation::Detected(candidate) => {
        (Mode::PromptPending, Some(Prediction::Prompt(candidate)))
      }
      Observation::Nothing => (Mode::Idle, None),
    };

    if mode != self.mode {
      debug!("第 {} 帧模式: {:?} -> {:?}", self.frame_number, self.mode, mode);
    }
    self.mode = mode;
    self.pending = pending;
  }

  /// 重新检测只替换候选框，模式不变
  pub fn replace_candidate(&mut self, candidate: Option<Candidate>) {
    if self.mode == Mode::PromptPending {
      self.pending = Some(Prediction::Prompt(candidate));
    }
  }

  /// 当前预测框，画面上有框时 `fix` 合法，否则 `label` 合法
  fn predicted_box(&self) -> Option<BBox> {
    match self.pending {
      Some(Prediction::Tracker(bbox)) => Some(bbox),
      Some(Prediction::Prompt(Some(candidate))) => Some(candidate.bbox),
      _ => None,
    }
  }

  pub fn decide(&self, event: InputEvent) -> Action {
    let predicted = self.predicted_box();

    match (event, self.mode) {
      (InputEvent::Quit, _) => Action::Quit,
      (InputEvent::Skip, _) => Action::Commit {
        record: AnnotationRecord::Skipped,
        init_tracker: None,
      },
      (InputEvent::Invisible, _) => Action::Commit {
        record: AnnotationRecord::Invisible,
        init_tracker: None,
      },
      (InputEvent::Label, _) if predicted.is_none() => Action::DrawBox,
      (InputEvent::Fix, Mode::Tracking | Mode::PromptPending) if predicted.is_some() => {
        Action::DrawBox
      }
      (InputEvent::Accept, Mode::Tracking) => match predicted {
        Some(bbox) => Action::Commit {
          record: AnnotationRecord::visible(bbox),
          init_tracker: None,
        },
        None => Action::Ignore,
      },
      (InputEvent::Accept, Mode::PromptPending) => match predicted {
        Some(bbox) => Action::Commit {
          record: AnnotationRecord::visible(bbox),
          init_tracker: Some(bbox),
        },
        None => Action::Ignore,
      },
      (InputEvent::Rerun, Mode::PromptPending) => Action::Rerun,
      _ => Action::Ignore,
    }
  }

  /// 操作员画好的框：记录可见并（重新）初始化跟踪
  pub fn drawn(&self, bbox: BBox) -> Action {
    Action::Commit {
      record: AnnotationRecord::visible(bbox),
      init_tracker: Some(bbox),
    }
  }

  /// 记录写入后调用；`tracker_initialized` 一旦为真便不再复位
  ///
  /// 前进后的模式：跟踪器已建立为 `Tracking`，否则为 `Idle`。
  /// 下一次暂停开始时由 [`Session::present`] 重新选择。
  pub fn advance(&mut self, tracker_initialized: bool) {
    self.tracker_armed |= tracker_initialized;
    self.frame_number += 1;
    self.pending = None;
    self.mode = if self.tracker_armed {
      Mode::Tracking
    } else {
      Mode::Idle
    };
  }

  /// 当前暂停的叠加层
  pub fn overlay(&self) -> Overlay {
    let options: &[&'static str] = match (self.mode, self.pending) {
      (Mode::Tracking, _) => &TRACKING_OPTIONS,
      (Mode::PromptPending, Some(Prediction::Prompt(Some(_)))) => &PROMPT_OPTIONS,
      (Mode::PromptPending, _) => &PROMPT_EMPTY_OPTIONS,
      (Mode::Idle, _) => &IDLE_OPTIONS,
    };

    let overlay = Overlay::new(options, self.frame_number);
    match self.pending {
      Some(Prediction::Tracker(bbox)) => overlay.with_box(bbox, BoxStyle::Tracker),
      Some(Prediction::Prompt(Some(candidate))) => {
        overlay.with_box(candidate.bbox, BoxStyle::Candidate(candidate.score))
      }
      Some(Prediction::Prompt(None)) => overlay.with_status("No candidate"),
      None => overlay,
    }
  }

  /// 画框时的叠加层
  pub fn drawing_overlay(&self) -> Overlay {
    Overlay::new(&DRAWING_OPTIONS, self.frame_number)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_matches::assert_matches;

  const BOX: BBox = BBox::new(10, 10, 20, 20);

  fn candidate() -> Candidate {
    Candidate {
      bbox: BOX,
      score: 0.9,
    }
  }

  #[test]
  fn probe_order() {
    let mut session = Session::new(true);
    assert_eq!(session.probe(), Probe::Detect);
    session.advance(true);
    assert_eq!(session.mode(), Mode::Tracking);
    assert_eq!(session.probe(), Probe::Track);
    assert_eq!(Session::new(false).probe(), Probe::Nothing);
  }

  #[test]
  fn idle_accepts_label_skip_invisible_quit() {
    let mut session = Session::new(false);
    session.present(Observation::Nothing);
    assert_eq!(session.mode(), Mode::Idle);
    assert_eq!(session.decide(InputEvent::Label), Action::DrawBox);
    assert_eq!(session.decide(InputEvent::Quit), Action::Quit);
    assert_matches!(
      session.decide(InputEvent::Skip),
      Action::Commit {
        record: AnnotationRecord::Skipped,
        init_tracker: None
      }
    );
    for event in [InputEvent::Accept, InputEvent::Fix, InputEvent::Rerun] {
      assert_eq!(session.decide(event), Action::Ignore);
    }
  }

  #[test]
  fn tracking_accept_keeps_tracker() {
    let mut session = Session::new(false);
    session.advance(true);
    session.present(Observation::Tracked(Some(BOX)));
    assert_eq!(session.mode(), Mode::Tracking);
    assert_eq!(
      session.decide(InputEvent::Accept),
      Action::Commit {
        record: AnnotationRecord::visible(BOX),
        init_tracker: None
      }
    );
    assert_eq!(session.decide(InputEvent::Fix), Action::DrawBox);
    assert_eq!(session.decide(InputEvent::Label), Action::Ignore);
    assert_eq!(session.decide(InputEvent::Rerun), Action::Ignore);
  }

  #[test]
  fn tracker_failure_degrades_one_pause() {
    let mut session = Session::new(false);
    session.advance(true);
    session.present(Observation::Tracked(None));
    assert_eq!(session.mode(), Mode::Idle);
    assert_eq!(session.decide(InputEvent::Label), Action::DrawBox);
    session.advance(false);
    assert!(session.tracker_armed());
    assert_eq!(session.probe(), Probe::Track);
  }

  #[test]
  fn prompt_accept_initializes_tracker() {
    let mut session = Session::new(true);
    session.present(Observation::Detected(Some(candidate())));
    assert_eq!(session.mode(), Mode::PromptPending);
    assert_eq!(
      session.decide(InputEvent::Accept),
      Action::Commit {
        record: AnnotationRecord::visible(BOX),
        init_tracker: Some(BOX)
      }
    );
    assert_eq!(session.decide(InputEvent::Rerun), Action::Rerun);
    assert_eq!(session.decide(InputEvent::Fix), Action::DrawBox);
    assert_eq!(session.decide(InputEvent::Label), Action::Ignore);
  }

  #[test]
  fn prompt_without_candidate() {
    let mut session = Session::new(true);
    session.present(Observation::Detected(None));
    assert_eq!(session.mode(), Mode::PromptPending);
    assert_eq!(session.decide(InputEvent::Accept), Action::Ignore);
    assert_eq!(session.decide(InputEvent::Fix), Action::Ignore);
    assert_eq!(session.decide(InputEvent::Label), Action::DrawBox);
    assert_eq!(session.decide(InputEvent::Rerun), Action::Rerun);
    assert_eq!(
      session.overlay().options,
      PROMPT_EMPTY_OPTIONS.to_vec()
    );

    session.advance(false);
    assert_eq!(session.mode(), Mode::Idle);
    assert_eq!(session.frame_number(), 1);
    assert_eq!(session.probe(), Probe::Detect);

    session.present(Observation::Detected(None));
    session.replace_candidate(Some(candidate()));
    assert_eq!(session.decide(InputEvent::Accept), Action::Commit {
      record: AnnotationRecord::visible(BOX),
      init_tracker: Some(BOX)
    });
  }

  #[test]
  fn drawn_box_initializes_tracker() {
    let session = Session::new(false);
    assert_eq!(
      session.drawn(BOX),
      Action::Commit {
        record: AnnotationRecord::visible(BOX),
        init_tracker: Some(BOX)
      }
    );
  }

  #[test]
  fn overlay_follows_prediction() {
    let mut session = Session::new(false);
    session.advance(true);
    session.present(Observation::Tracked(Some(BOX)));
    let overlay = session.overlay();
    assert_eq!(overlay.frame_number, 1);
    assert_eq!(overlay.options, TRACKING_OPTIONS.to_vec());
    assert_eq!(overlay.boxes, vec![(BOX, BoxStyle::Tracker)]);
  }
}
