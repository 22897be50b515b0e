// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/input/gstreamer_input.rs - GStreamer 视频文件输入
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

//! # GStreamer 视频输入模块
//!
//! 通过 `filesrc ! decodebin ! videoconvert` 解码视频文件，逐帧拉取 RGB 图像。
//! 标注时按顺序读取；回放时按帧序号做精确定位（flush + accurate seek）。
//!
//! ## 系统依赖
//!
//! **Ubuntu/Debian:**
//! ```bash
//! sudo apt-get install libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev
//! ```
//!
//! ## URL
//!
//! `gst://file/path/to/video.mp4`
//!
//! appsink 不丢帧（`drop=false`），并关闭时钟同步，因此拉取速度由操作员决定。

use std::path::Path;

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{VideoFrame, frame_midpoint_nanos, rgb_image_from_strided},
  input::FrameSource,
};

/// GStreamer 输入错误类型
#[derive(Error, Debug)]
pub enum GStreamerInputError {
  /// URI scheme 不匹配（期望 "gst://file/..."）
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  /// GStreamer 库错误
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  /// GStreamer 布尔操作错误
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  /// 无法获取 appsink 元素
  #[error("Failed to get appsink element")]
  AppSinkNotFound,
  /// 无法转换元素为 appsink
  #[error("Failed to convert element to appsink")]
  AppSinkConversionFailed,
  /// 无法从 caps 获取视频信息
  #[error("Failed to get video info from caps")]
  VideoInfoError,
  /// 不支持的视频格式
  #[error("Unsupported video format")]
  UnsupportedFormat,
  /// 帧率未知，无法按序号定位
  #[error("Unknown frame rate, cannot seek by frame index")]
  UnknownFrameRate,
  /// 管道错误
  #[error("Pipeline error: {0}")]
  PipelineError(String),
  /// 缓冲区大小不匹配
  #[error("Buffer size mismatch: expected {expected} bytes, got {actual} bytes")]
  BufferSizeMismatch { expected: usize, actual: usize },
  /// 状态改变错误
  #[error("State change error: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
}

/// GStreamer 视频文件帧源
pub struct GStreamerVideoSource {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
  frame_rate: Option<gst::Fraction>,
  position: usize,
}

impl FromUrlWithScheme for GStreamerVideoSource {
  const SCHEME: &'static str = "gst";
}

impl FromUrl for GStreamerVideoSource {
  type Error = GStreamerInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME || url.host_str() != Some("file") {
      error!("URI scheme mismatch: expected 'gst://file/...', found '{}'", url);
      return Err(GStreamerInputError::SchemeMismatch);
    }
    Self::open(Path::new(url.path()))
  }
}

impl Drop for GStreamerVideoSource {
  fn drop(&mut self) {
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("Failed to stop GStreamer pipeline: {}", e);
    }
  }
}

impl GStreamerVideoSource {
  pub fn open(path: &Path) -> Result<Self, GStreamerInputError> {
    gst::init()?;

    let pipeline_desc = format!(
      "filesrc location=\"{}\" ! decodebin ! videoconvert ! video/x-raw,format=RGB ! \
       appsink name=sink sync=false max-buffers=2 drop=false",
      path.display()
    );
    info!("GStreamer pipeline description: {}", pipeline_desc);

    let pipeline = gst::parse::launch(&pipeline_desc)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerInputError::PipelineError("Failed to create pipeline".to_string()))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerInputError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerInputError::AppSinkConversionFailed)?;

    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerVideoSource {
      pipeline,
      appsink,
      frame_rate: None,
      position: 0,
    })
  }

  /// 拉取一帧；到达末尾时返回 `Ok(None)`
  fn pull(&mut self, index: usize) -> Result<Option<VideoFrame>, GStreamerInputError> {
    let sample = match self.appsink.pull_sample() {
      Ok(sample) => sample,
      Err(e) => {
        if self.appsink.is_eos() {
          debug!("GStreamer 输入到达末尾");
          return Ok(None);
        }
        return Err(GStreamerInputError::PipelineError(format!(
          "Failed to pull sample: {}",
          e
        )));
      }
    };

    let (image, frame_rate) = convert_sample_to_rgb(&sample)?;
    if self.frame_rate.is_none() && frame_rate.numer() > 0 {
      info!(
        "视频帧率: {}/{}",
        frame_rate.numer(),
        frame_rate.denom()
      );
      self.frame_rate = Some(frame_rate);
    }
    Ok(Some(VideoFrame::new(index, image)))
  }

  fn frame_timestamp(&self, index: usize) -> Result<gst::ClockTime, GStreamerInputError> {
    let rate = self
      .frame_rate
      .as_ref()
      .ok_or(GStreamerInputError::UnknownFrameRate)?;
    let nanos = frame_midpoint_nanos(index, rate.numer() as u64, rate.denom() as u64)
      .ok_or(GStreamerInputError::UnknownFrameRate)?;
    Ok(gst::ClockTime::from_nseconds(nanos))
  }
}

impl FrameSource for GStreamerVideoSource {
  type Error = GStreamerInputError;

  fn next_frame(&mut self) -> Result<Option<VideoFrame>, Self::Error> {
    let frame = self.pull(self.position)?;
    if frame.is_some() {
      self.position += 1;
    }
    Ok(frame)
  }

  fn seek(&mut self, index: usize) -> Result<Option<VideoFrame>, Self::Error> {
    if self.frame_rate.is_none() {
      // 帧率来自第一帧的 caps
      if self.next_frame()?.is_none() {
        return Ok(None);
      }
    }

    let timestamp = self.frame_timestamp(index)?;
    debug!("定位到第 {} 帧 ({})", index, timestamp);
    self
      .pipeline
      .seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE, timestamp)?;

    let frame = self.pull(index)?;
    self.position = if frame.is_some() { index + 1 } else { index };
    Ok(frame)
  }
}

fn convert_sample_to_rgb(
  sample: &gst::Sample,
) -> Result<(image::RgbImage, gst::Fraction), GStreamerInputError> {
  let buffer = sample
    .buffer()
    .ok_or_else(|| GStreamerInputError::PipelineError("No buffer in sample".to_string()))?;
  let caps = sample
    .caps()
    .ok_or_else(|| GStreamerInputError::PipelineError("No caps in sample".to_string()))?;

  let video_info =
    gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerInputError::VideoInfoError)?;
  if video_info.format() != gst_video::VideoFormat::Rgb {
    return Err(GStreamerInputError::UnsupportedFormat);
  }

  let width = video_info.width();
  let height = video_info.height();
  let stride = video_info.stride()[0] as usize;

  let map = buffer.map_readable().map_err(|e| {
    GStreamerInputError::PipelineError(format!("Failed to map buffer for reading: {}", e))
  })?;
  let data = map.as_slice();

  let image = rgb_image_from_strided(data, width, height, stride).ok_or(
    GStreamerInputError::BufferSizeMismatch {
      expected: stride * height as usize,
      actual: data.len(),
    },
  )?;

  Ok((image, video_info.fps()))
}
