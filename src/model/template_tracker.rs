// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/model/template_tracker.rs - 模板匹配跟踪器
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

use image::{GrayImage, imageops};
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use tracing::{debug, warn};

use crate::{
  frame::VideoFrame,
  model::{BBox, Tracker},
};

const DEFAULT_MATCH_THRESHOLD: f32 = 0.25;

/// 基于灰度模板匹配的单目标跟踪器
///
/// 初始化时截取框内灰度图作为模板，之后每帧在上一位置周围的搜索窗口内
/// 用归一化平方差寻找最佳位置。最佳得分高于阈值时视为跟踪失败。
pub struct TemplateTracker {
  template: Option<GrayImage>,
  last: Option<BBox>,
  threshold: f32,
}

impl Default for TemplateTracker {
  fn default() -> Self {
    Self::new(DEFAULT_MATCH_THRESHOLD)
  }
}

impl TemplateTracker {
  pub fn new(threshold: f32) -> Self {
    Self {
      template: None,
      last: None,
      threshold,
    }
  }

  fn search_window(last: &BBox, width: u32, height: u32) -> Option<BBox> {
    let margin = last.width.max(last.height);
    BBox::new(
      last.x - margin,
      last.y - margin,
      last.width + 2 * margin,
      last.height + 2 * margin,
    )
    .clamp_to(width, height)
  }
}

impl Tracker for TemplateTracker {
  fn init(&mut self, frame: &VideoFrame, bbox: BBox) {
    let Some(bbox) = bbox.clamp_to(frame.width(), frame.height()) else {
      warn!("跟踪框 {:?} 不在图像范围内，跟踪器未初始化", bbox);
      self.template = None;
      self.last = None;
      return;
    };

    let gray = imageops::grayscale(&frame.image);
    let template = imageops::crop_imm(
      &gray,
      bbox.x as u32,
      bbox.y as u32,
      bbox.width as u32,
      bbox.height as u32,
    )
    .to_image();

    debug!("跟踪器初始化于第 {} 帧: {:?}", frame.index, bbox);
    self.template = Some(template);
    self.last = Some(bbox);
  }

  fn update(&mut self, frame: &VideoFrame) -> Option<BBox> {
    let template = self.template.as_ref()?;
    let last = self.last?;

    let window = Self::search_window(&last, frame.width(), frame.height())?;
    if window.width < template.width() as i32 || window.height < template.height() as i32 {
      return None;
    }

    let gray = imageops::grayscale(&frame.image);
    let region = imageops::crop_imm(
      &gray,
      window.x as u32,
      window.y as u32,
      window.width as u32,
      window.height as u32,
    )
    .to_image();

    let scores = match_template(
      &region,
      template,
      MatchTemplateMethod::SumOfSquaredErrorsNormalized,
    );

    let mut best: Option<(u32, u32, f32)> = None;
    for (x, y, pixel) in scores.enumerate_pixels() {
      let score = pixel[0];
      if !score.is_finite() {
        continue;
      }
      if best.is_none_or(|(_, _, s)| score < s) {
        best = Some((x, y, score));
      }
    }

    let (x, y, score) = best?;
    if score > self.threshold {
      debug!("第 {} 帧跟踪失败，最佳得分 {:.4}", frame.index, score);
      return None;
    }

    let bbox = BBox::new(
      window.x + x as i32,
      window.y + y as i32,
      last.width,
      last.height,
    );
    self.last = Some(bbox);
    Some(bbox)
  }
}
