// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/frame.rs - 图像方向与旋转
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

use std::fmt;

use image::{RgbImage, imageops};
use serde::Serialize;

/// 推理方向，角度以逆时针为正
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Orientation {
  #[serde(rename = "0")]
  Deg0,
  #[serde(rename = "90")]
  Deg90,
  #[serde(rename = "180")]
  Deg180,
  #[serde(rename = "270")]
  Deg270,
}

/// 固定的推理顺序，少于四个方向时取前缀
pub const ORIENTATION_ORDER: [Orientation; 4] = [
  Orientation::Deg0,
  Orientation::Deg90,
  Orientation::Deg180,
  Orientation::Deg270,
];

impl Orientation {
  pub fn degrees(self) -> u32 {
    match self {
      Orientation::Deg0 => 0,
      Orientation::Deg90 => 90,
      Orientation::Deg180 => 180,
      Orientation::Deg270 => 270,
    }
  }

  /// 是否交换画布宽高
  pub fn swaps_axes(self) -> bool {
    matches!(self, Orientation::Deg90 | Orientation::Deg270)
  }

  /// 给定原始图像的 (宽, 高)，返回旋转后画布的 (宽, 高)
  pub fn rotated_dimensions(self, width: u32, height: u32) -> (u32, u32) {
    if self.swaps_axes() {
      (height, width)
    } else {
      (width, height)
    }
  }
}

impl fmt::Display for Orientation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}°", self.degrees())
  }
}

/// 可以按标准方向旋转的帧
///
/// 旋转采用扩展画布语义：90° 和 270° 交换宽高，内容不裁剪。
pub trait OrientedFrame: Sized {
  /// 返回 (宽, 高)
  fn dimensions(&self) -> (u32, u32);

  fn rotate(&self, orientation: Orientation) -> Self;
}

impl OrientedFrame for RgbImage {
  fn dimensions(&self) -> (u32, u32) {
    RgbImage::dimensions(self)
  }

  fn rotate(&self, orientation: Orientation) -> Self {
    // imageops 的 rotate90 为顺时针
    match orientation {
      Orientation::Deg0 => self.clone(),
      Orientation::Deg90 => imageops::rotate270(self),
      Orientation::Deg180 => imageops::rotate180(self),
      Orientation::Deg270 => imageops::rotate90(self),
    }
  }
}
