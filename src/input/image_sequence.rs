// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/input/image_sequence.rs - 图像序列输入
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

use image::ImageReader;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::VideoFrame, input::FrameSource};

#[derive(Error, Debug)]
pub enum ImageSequenceError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Not a directory: {0}")]
  NotADirectory(PathBuf),
}

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// 目录中按文件名排序的图像帧
#[derive(Debug)]
pub struct ImageSequenceSource {
  frames: Vec<PathBuf>,
  position: usize,
}

impl FromUrlWithScheme for ImageSequenceSource {
  const SCHEME: &'static str = "frames";
}

impl FromUrl for ImageSequenceSource {
  type Error = ImageSequenceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageSequenceError::SchemaMismatch);
    }
    Self::open(Path::new(url.path()))
  }
}

impl ImageSequenceSource {
  pub fn open(directory: &Path) -> Result<Self, ImageSequenceError> {
    if !directory.is_dir() {
      return Err(ImageSequenceError::NotADirectory(directory.to_path_buf()));
    }

    let mut frames = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      let is_frame = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
      if is_frame && path.is_file() {
        frames.push(path);
      }
    }
    frames.sort();

    info!("{} 中共有 {} 帧", directory.display(), frames.len());
    Ok(Self {
      frames,
      position: 0,
    })
  }

  pub fn len(&self) -> usize {
    self.frames.len()
  }

  pub fn is_empty(&self) -> bool {
    self.frames.is_empty()
  }

  fn decode(&self, index: usize) -> Result<Option<VideoFrame>, ImageSequenceError> {
    let Some(path) = self.frames.get(index) else {
      return Ok(None);
    };
    let image = ImageReader::open(path)?.decode()?.into_rgb8();
    Ok(Some(VideoFrame::new(index, image)))
  }
}

impl FrameSource for ImageSequenceSource {
  type Error = ImageSequenceError;

  fn next_frame(&mut self) -> Result<Option<VideoFrame>, Self::Error> {
    let frame = self.decode(self.position)?;
    if frame.is_some() {
      self.position += 1;
    }
    Ok(frame)
  }

  fn seek(&mut self, index: usize) -> Result<Option<VideoFrame>, Self::Error> {
    let frame = self.decode(index)?;
    self.position = index.saturating_add(1).min(self.frames.len());
    Ok(frame)
  }
}
