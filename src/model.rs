// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/model.rs - 跟踪器与提示词检测器
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

use crate::frame::VideoFrame;

/// 左上角 + 宽高表示的边框，单位为像素
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BBox {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl BBox {
  pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.width <= 0 || self.height <= 0
  }

  /// 与 `width x height` 图像求交，结果为空时返回 `None`
  pub fn clamp_to(&self, width: u32, height: u32) -> Option<BBox> {
    let x_min = self.x.clamp(0, width as i32);
    let y_min = self.y.clamp(0, height as i32);
    let x_max = (self.x + self.width).clamp(0, width as i32);
    let y_max = (self.y + self.height).clamp(0, height as i32);
    let clamped = BBox::new(x_min, y_min, x_max - x_min, y_max - y_min);
    (!clamped.is_empty()).then_some(clamped)
  }
}

/// 检测器给出的候选框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub bbox: BBox,
  pub score: f32,
}

/// 单目标跟踪能力
///
/// `init` 以人工或检测器给出的框重新开始跟踪；`update` 在新的一帧上推进，
/// 返回 `None` 表示本帧跟踪失败，之后的帧仍可继续调用 `update`。
pub trait Tracker {
  fn init(&mut self, frame: &VideoFrame, bbox: BBox);
  fn update(&mut self, frame: &VideoFrame) -> Option<BBox>;
}

/// 文本提示词检测能力，每次调用互不相关
pub trait PromptDetector {
  type Error;

  fn detect(&self, frame: &VideoFrame, prompt: &str) -> Result<Option<Candidate>, Self::Error>;
}

mod command_detector;
mod template_tracker;

pub use self::command_detector::{CommandDetector, CommandDetectorError};
pub use self::template_tracker::TemplateTracker;
