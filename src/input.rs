// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/input.rs - 视频帧输入
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::VideoFrame};

/// 顺序读取、可按序号定位的帧源
///
/// 两个方法返回 `Ok(None)` 均表示已到达视频末尾。
pub trait FrameSource {
  type Error: std::error::Error + Send + Sync + 'static;

  fn next_frame(&mut self) -> Result<Option<VideoFrame>, Self::Error>;
  fn seek(&mut self, index: usize) -> Result<Option<VideoFrame>, Self::Error>;
}

mod image_sequence;
pub use self::image_sequence::{ImageSequenceError, ImageSequenceSource};

#[cfg(feature = "gstreamer_input")]
mod gstreamer_input;
#[cfg(feature = "gstreamer_input")]
pub use self::gstreamer_input::{GStreamerInputError, GStreamerVideoSource};

#[derive(Error, Debug)]
pub enum SourceError {
  #[error("图像序列输入错误: {0}")]
  ImageSequenceError(#[from] ImageSequenceError),
  #[cfg(feature = "gstreamer_input")]
  #[error("GStreamer 输入错误: {0}")]
  GStreamerInputError(#[from] GStreamerInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("不支持的输入: {0}（视频文件需要启用 gstreamer_input 特性）")]
  Unsupported(String),
}

pub enum SourceWrapper {
  ImageSequence(ImageSequenceSource),
  #[cfg(feature = "gstreamer_input")]
  GStreamer(GStreamerVideoSource),
}

impl SourceWrapper {
  /// 打开帧源：可以是 `frames://` / `gst://` URL，也可以是目录或视频文件路径
  pub fn open(spec: &str) -> Result<Self, SourceError> {
    if let Ok(url) = Url::parse(spec)
      && url.scheme().len() > 1
    {
      return Self::from_url(&url);
    }

    let path = Path::new(spec);
    if path.is_dir() {
      info!("以图像序列方式打开: {}", path.display());
      return Ok(SourceWrapper::ImageSequence(ImageSequenceSource::open(path)?));
    }

    #[cfg(feature = "gstreamer_input")]
    {
      info!("以 GStreamer 方式打开视频文件: {}", path.display());
      Ok(SourceWrapper::GStreamer(GStreamerVideoSource::open(path)?))
    }
    #[cfg(not(feature = "gstreamer_input"))]
    {
      Err(SourceError::Unsupported(spec.to_string()))
    }
  }
}

/// 帧源在文件系统上的位置，用于推导默认标注文件路径
pub fn source_path(spec: &str) -> PathBuf {
  match Url::parse(spec) {
    Ok(url) if url.scheme().len() > 1 => PathBuf::from(url.path()),
    _ => PathBuf::from(spec),
  }
}

impl FromUrl for SourceWrapper {
  type Error = SourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() == ImageSequenceSource::SCHEME {
      return Ok(SourceWrapper::ImageSequence(ImageSequenceSource::from_url(
        url,
      )?));
    }
    #[cfg(feature = "gstreamer_input")]
    {
      if url.scheme() == GStreamerVideoSource::SCHEME {
        return Ok(SourceWrapper::GStreamer(GStreamerVideoSource::from_url(url)?));
      }
    }
    Err(SourceError::SchemeMismatch)
  }
}

impl FrameSource for SourceWrapper {
  type Error = SourceError;

  fn next_frame(&mut self) -> Result<Option<VideoFrame>, Self::Error> {
    match self {
      SourceWrapper::ImageSequence(source) => source.next_frame().map_err(SourceError::from),
      #[cfg(feature = "gstreamer_input")]
      SourceWrapper::GStreamer(source) => source.next_frame().map_err(SourceError::from),
    }
  }

  fn seek(&mut self, index: usize) -> Result<Option<VideoFrame>, Self::Error> {
    match self {
      SourceWrapper::ImageSequence(source) => source.seek(index).map_err(SourceError::from),
      #[cfg(feature = "gstreamer_input")]
      SourceWrapper::GStreamer(source) => source.seek(index).map_err(SourceError::from),
    }
  }
}
