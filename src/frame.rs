// 该文件是 Zhenbiao （帧标） 项目的一部分。
// src/frame.rs - 视频帧定义
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

use image::RgbImage;

/// 解码后的一帧图像及其在视频中的序号（从 0 开始）
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
  pub index: usize,
  pub image: RgbImage,
}

impl VideoFrame {
  pub fn new(index: usize, image: RgbImage) -> Self {
    Self { index, image }
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}

impl AsRef<RgbImage> for VideoFrame {
  fn as_ref(&self) -> &RgbImage {
    &self.image
  }
}

/// 将紧凑或带行填充的 RGB 数据复制为 `RgbImage`
///
/// `stride` 为每行字节数，需不小于 `width * 3`。数据不足时返回 `None`。
pub fn rgb_image_from_strided(
  data: &[u8],
  width: u32,
  height: u32,
  stride: usize,
) -> Option<RgbImage> {
  let row_bytes = width as usize * 3;
  if stride < row_bytes {
    return None;
  }
  if height > 0 && data.len() < stride * (height as usize - 1) + row_bytes {
    return None;
  }

  let mut packed = Vec::with_capacity(row_bytes * height as usize);
  for row in 0..height as usize {
    let start = row * stride;
    packed.extend_from_slice(&data[start..start + row_bytes]);
  }
  RgbImage::from_raw(width, height, packed)
}

/// 第 `index` 帧中点的时间戳（纳秒）
///
/// 定位到帧中点，避免时间戳取整后落在前一帧。帧率为 `numer / denom`，
/// `numer` 为 0 时返回 `None`。
pub fn frame_midpoint_nanos(index: usize, numer: u64, denom: u64) -> Option<u64> {
  if numer == 0 {
    return None;
  }
  let nanos = (2 * index as u128 + 1) * 1_000_000_000 * denom as u128 / (2 * numer as u128);
  u64::try_from(nanos).ok()
}
