// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/output/save_image_file.rs - 保存预览图像文件
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
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::VideoFrame,
  output::{Overlay, Render, draw::Draw},
};

/// 每次暂停都覆盖写入同一个图像文件，配合可自动刷新的图片查看器使用
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput::new(Path::new(uri.path()), Draw::default()))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: &Path, draw: Draw) -> Self {
    Self {
      path: path.to_path_buf(),
      draw,
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_image(&self, image: image::RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;

    debug!("保存预览到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &VideoFrame, overlay: &Overlay) -> Result<(), Self::Error> {
    let image = self.draw.compose(&frame.image, overlay);
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BBox;
  use crate::output::BoxStyle;
  use image::RgbImage;

  #[test]
  fn writes_composed_preview() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("preview.png");
    let output = SaveImageFileOutput::new(&path, Draw::without_font());

    let frame = VideoFrame::new(0, RgbImage::new(20, 20));
    let overlay = Overlay::new(&[], 0).with_box(BBox::new(2, 2, 8, 8), BoxStyle::Tracker);
    output.render_result(&frame, &overlay).unwrap();

    let saved = image::open(&path).unwrap().into_rgb8();
    assert_eq!(saved.get_pixel(2, 2).0, [0, 255, 0]);
    assert_eq!(saved.get_pixel(15, 15).0, [0, 0, 0]);
  }

  #[test]
  fn url_scheme_is_checked() {
    let url = Url::parse("folder:///tmp/preview.png").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }
}
