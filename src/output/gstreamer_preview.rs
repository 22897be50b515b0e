// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/output/gstreamer_preview.rs - GStreamer 预览窗口
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

//! # GStreamer 预览窗口
//!
//! `appsrc ! videoconvert ! autovideosink`，每次暂停推送一帧合成画面。
//! caps 按第一帧尺寸设置，尺寸变化时重新设置。
//!
//! ## URL Scheme
//!
//! `gstpreview://window`

use std::sync::Mutex;

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::VideoFrame,
  output::{Overlay, Render, draw::Draw},
};

// 预览帧的名义帧率，只用于时间戳
const PREVIEW_FPS: u64 = 30;

/// GStreamer 预览错误类型
#[derive(Error, Debug)]
pub enum GStreamerPreviewError {
  /// URI scheme 不匹配
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  /// GStreamer 库错误
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  /// GStreamer 布尔操作错误
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  /// 无法获取 appsrc 元素
  #[error("Failed to get appsrc element")]
  AppSrcNotFound,
  /// 无法转换元素为 appsrc
  #[error("Failed to convert element to appsrc")]
  AppSrcConversionFailed,
  /// 管道错误
  #[error("Pipeline error: {0}")]
  PipelineError(String),
  /// 状态改变错误
  #[error("State change error: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
  /// 缓冲区创建错误
  #[error("Buffer creation error")]
  BufferCreationError,
}

struct PreviewState {
  frame_count: u64,
  size: Option<(u32, u32)>,
}

pub struct GStreamerPreviewOutput {
  pipeline: gst::Pipeline,
  appsrc: gst_app::AppSrc,
  draw: Draw,
  state: Mutex<PreviewState>,
}

impl FromUrlWithScheme for GStreamerPreviewOutput {
  const SCHEME: &'static str = "gstpreview";
}

impl FromUrl for GStreamerPreviewOutput {
  type Error = GStreamerPreviewError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GStreamerPreviewError::SchemeMismatch);
    }

    gst::init()?;

    let pipeline_desc = "appsrc name=src is-live=true ! videoconvert ! autovideosink sync=false";
    info!("Creating preview pipeline: {}", pipeline_desc);

    let pipeline = gst::parse::launch(pipeline_desc)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerPreviewError::PipelineError("Failed to create pipeline".to_string()))?;

    let appsrc = pipeline
      .by_name("src")
      .ok_or(GStreamerPreviewError::AppSrcNotFound)?
      .downcast::<gst_app::AppSrc>()
      .map_err(|_| GStreamerPreviewError::AppSrcConversionFailed)?;
    appsrc.set_format(gst::Format::Time);

    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerPreviewOutput {
      pipeline,
      appsrc,
      draw: Draw::default(),
      state: Mutex::new(PreviewState {
        frame_count: 0,
        size: None,
      }),
    })
  }
}

impl Drop for GStreamerPreviewOutput {
  fn drop(&mut self) {
    let _ = self.appsrc.end_of_stream();
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("Failed to stop GStreamer preview pipeline: {}", e);
    }
  }
}

impl GStreamerPreviewOutput {
  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  fn push_image(&self, image: &image::RgbImage) -> Result<(), GStreamerPreviewError> {
    let mut state = self
      .state
      .lock()
      .map_err(|_| GStreamerPreviewError::PipelineError("Preview state poisoned".to_string()))?;

    let size = image.dimensions();
    if state.size != Some(size) {
      let caps = gst::Caps::builder("video/x-raw")
        .field("format", "RGB")
        .field("width", size.0 as i32)
        .field("height", size.1 as i32)
        .field("framerate", gst::Fraction::new(PREVIEW_FPS as i32, 1))
        .build();
      self.appsrc.set_caps(Some(&caps));
      info!("预览尺寸: {}x{}", size.0, size.1);
      state.size = Some(size);
    }

    // RGB 行宽不是 4 的倍数时 GStreamer 期望行填充
    let row_bytes = size.0 as usize * 3;
    let stride = row_bytes.div_ceil(4) * 4;
    let raw = image.as_raw();
    let mut buffer = gst::Buffer::with_size(stride * size.1 as usize)
      .map_err(|_| GStreamerPreviewError::BufferCreationError)?;

    {
      let buffer_ref = buffer
        .get_mut()
        .ok_or(GStreamerPreviewError::BufferCreationError)?;
      let mut map = buffer_ref.map_writable().map_err(|_| {
        GStreamerPreviewError::PipelineError("Failed to map buffer".to_string())
      })?;
      for (row, chunk) in raw.chunks_exact(row_bytes).enumerate() {
        map[row * stride..row * stride + row_bytes].copy_from_slice(chunk);
      }
    }

    let timestamp = state.frame_count * 1_000_000_000 / PREVIEW_FPS;
    state.frame_count += 1;

    {
      let buffer_ref = buffer
        .get_mut()
        .ok_or(GStreamerPreviewError::BufferCreationError)?;
      buffer_ref.set_pts(gst::ClockTime::from_nseconds(timestamp));
      buffer_ref.set_duration(gst::ClockTime::from_nseconds(1_000_000_000 / PREVIEW_FPS));
    }

    self.appsrc.push_buffer(buffer).map_err(|e| {
      GStreamerPreviewError::PipelineError(format!("Failed to push buffer: {:?}", e))
    })?;

    Ok(())
  }
}

impl Render for GStreamerPreviewOutput {
  type Error = GStreamerPreviewError;

  fn render_result(&self, frame: &VideoFrame, overlay: &Overlay) -> Result<(), Self::Error> {
    let image = self.draw.compose(&frame.image, overlay);
    self.push_image(&image)
  }
}
