// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/output.rs - 画面输出定义
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
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::VideoFrame, model::BBox};

/// 将干净的帧与叠加层合成后展示给操作员
pub trait Render: Sized {
  type Error;
  fn render_result(&self, frame: &VideoFrame, overlay: &Overlay) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxStyle {
  /// 已保存的标注
  Annotation,
  /// 跟踪器预测
  Tracker,
  /// 检测器候选框及其得分
  Candidate(f32),
}

/// 每次暂停时叠加在帧上的内容，总是由状态派生，不修改原始帧
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
  pub options: Vec<&'static str>,
  pub frame_number: usize,
  pub boxes: Vec<(BBox, BoxStyle)>,
  pub status: Option<String>,
}

impl Overlay {
  pub fn new(options: &[&'static str], frame_number: usize) -> Self {
    Self {
      options: options.to_vec(),
      frame_number,
      boxes: Vec::new(),
      status: None,
    }
  }

  pub fn with_box(mut self, bbox: BBox, style: BoxStyle) -> Self {
    self.boxes.push((bbox, style));
    self
  }

  pub fn with_status(mut self, status: impl Into<String>) -> Self {
    self.status = Some(status.into());
    self
  }

  /// 信息栏文本：可用按键 + 当前帧号
  pub fn info_text(&self) -> String {
    let mut text = String::new();
    for option in self.options.iter() {
      text.push_str(option);
      text.push_str(" | ");
    }
    text.push_str(&format!("Frame : {}", self.frame_number));
    text
  }
}

/// 默认预览：系统临时目录下的 PNG 文件
pub fn default_preview_url() -> Result<Url, url::ParseError> {
  let path = std::env::temp_dir().join("zhenbiao-preview.png");
  Url::parse(&format!("{}://{}", SaveImageFileOutput::SCHEME, path.display()))
}

pub mod draw;

mod save_image_file;
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "gstreamer_output")]
mod gstreamer_preview;
#[cfg(feature = "gstreamer_output")]
pub use self::gstreamer_preview::{GStreamerPreviewError, GStreamerPreviewOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "gstreamer_output")]
  #[error("GStreamer 预览错误: {0}")]
  GStreamerPreviewError(#[from] GStreamerPreviewError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "gstreamer_output")]
  GStreamerPreviewOutput(GStreamerPreviewOutput),
}

impl OutputWrapper {
  pub fn with_draw(self, draw: draw::Draw) -> Self {
    match self {
      OutputWrapper::SaveImageFileOutput(output) => {
        OutputWrapper::SaveImageFileOutput(output.with_draw(draw))
      }
      #[cfg(feature = "gstreamer_output")]
      OutputWrapper::GStreamerPreviewOutput(output) => {
        OutputWrapper::GStreamerPreviewOutput(output.with_draw(draw))
      }
    }
  }
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "gstreamer_output")]
      GStreamerPreviewOutput::SCHEME => {
        let output = GStreamerPreviewOutput::from_url(url)?;
        Ok(OutputWrapper::GStreamerPreviewOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &VideoFrame, overlay: &Overlay) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(frame, overlay)
        .map_err(OutputError::from),
      #[cfg(feature = "gstreamer_output")]
      OutputWrapper::GStreamerPreviewOutput(output) => output
        .render_result(frame, overlay)
        .map_err(OutputError::from),
    }
  }
}
