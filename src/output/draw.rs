// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/output/draw.rs - 叠加层绘制
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  model::BBox,
  output::{BoxStyle, Overlay},
};

// 文本渲染常量
const MAX_FONT_SIZE: f32 = 28.0;
const MIN_FONT_SIZE: f32 = 8.0;
const FONT_SIZE_STEP: f32 = 2.0;
const TEXT_MARGIN: i32 = 10;
const BAR_PADDING: i32 = 6;

const ANNOTATION_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const CANDIDATE_COLOR: [u8; 3] = [255, 200, 0]; // 黄色
const STATUS_COLOR: [u8; 3] = [255, 64, 64];
const TEXT_COLOR: [u8; 3] = [255, 255, 255];
const BAR_COLOR: [u8; 3] = [0, 0, 0];

const SYSTEM_FONTS: [&str; 6] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "/Library/Fonts/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 叠加层合成器，没有字体时只画框
pub struct Draw {
  font: Option<FontVec>,
}

impl Default for Draw {
  fn default() -> Self {
    Self::with_system_font()
  }
}

impl Draw {
  pub fn without_font() -> Self {
    Self { font: None }
  }

  pub fn with_font_file(path: &Path) -> Result<Self, DrawError> {
    let data = std::fs::read(path)?;
    let font = FontVec::try_from_vec(data)?;
    info!("已加载字体: {}", path.display());
    Ok(Self { font: Some(font) })
  }

  /// 依次尝试常见的系统字体
  pub fn with_system_font() -> Self {
    for candidate in SYSTEM_FONTS {
      let path = Path::new(candidate);
      if path.is_file()
        && let Ok(draw) = Self::with_font_file(path)
      {
        return draw;
      }
    }
    warn!("未找到可用字体，画面上将不显示文字");
    Self::without_font()
  }

  /// 合成显示帧：复制干净帧后绘制叠加层
  pub fn compose(&self, frame: &RgbImage, overlay: &Overlay) -> RgbImage {
    let mut image = frame.clone();

    for (bbox, style) in overlay.boxes.iter() {
      self.draw_box(&mut image, bbox, style);
    }

    let bar_bottom = self.draw_info_bar(&mut image, &overlay.info_text());
    if let Some(status) = overlay.status.as_deref() {
      self.draw_label(
        &mut image,
        status,
        TEXT_MARGIN,
        bar_bottom + BAR_PADDING,
        STATUS_COLOR,
      );
    }

    image
  }

  fn draw_box(&self, image: &mut RgbImage, bbox: &BBox, style: &BoxStyle) {
    let Some(clamped) = bbox.clamp_to(image.width(), image.height()) else {
      return;
    };
    let color = match style {
      BoxStyle::Annotation | BoxStyle::Tracker => Rgb(ANNOTATION_COLOR),
      BoxStyle::Candidate(_) => Rgb(CANDIDATE_COLOR),
    };

    let (x, y) = (clamped.x, clamped.y);
    let (width, height) = (clamped.width as u32, clamped.height as u32);
    draw_hollow_rect_mut(image, Rect::at(x, y).of_size(width, height), color);

    // 绘制第二个边框以增加可见度
    if width > 2 && height > 2 {
      let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
      draw_hollow_rect_mut(image, inner, color);
    }

    if let BoxStyle::Candidate(score) = style {
      let label = format!("{:.2}", score);
      let text_y = (y - MAX_FONT_SIZE as i32).max(0);
      self.draw_label(image, &label, x, text_y, CANDIDATE_COLOR);
    }
  }

  /// 画顶部信息栏，返回信息栏下边缘的 y 坐标
  fn draw_info_bar(&self, image: &mut RgbImage, text: &str) -> i32 {
    let Some(font) = self.font.as_ref() else {
      return 0;
    };

    let available = (image.width() as i32 - 2 * TEXT_MARGIN).max(1) as u32;
    let mut size = MAX_FONT_SIZE;
    let (mut text_width, mut text_height) = text_size(PxScale::from(size), font, text);
    while text_width > available && size > MIN_FONT_SIZE {
      size -= FONT_SIZE_STEP;
      (text_width, text_height) = text_size(PxScale::from(size), font, text);
    }

    let bar_height = text_height as i32 + 2 * BAR_PADDING;
    let bar = Rect::at(0, 0).of_size(image.width().max(1), bar_height.max(1) as u32);
    draw_filled_rect_mut(image, bar, Rgb(BAR_COLOR));
    draw_text_mut(
      image,
      Rgb(TEXT_COLOR),
      TEXT_MARGIN,
      BAR_PADDING,
      PxScale::from(size),
      font,
      text,
    );
    bar_height
  }

  fn draw_label(&self, image: &mut RgbImage, text: &str, x: i32, y: i32, color: [u8; 3]) {
    if let Some(font) = self.font.as_ref() {
      draw_text_mut(
        image,
        Rgb(color),
        x,
        y,
        PxScale::from(MAX_FONT_SIZE * 0.75),
        font,
        text,
      );
    }
  }
}
