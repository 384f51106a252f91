// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/model/orientation.rs - 旋转坐标映射
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

use crate::{frame::Orientation, model::DetectItem};

impl Orientation {
  /// 把旋转画布中的检测框映射回原始图像坐标
  ///
  /// `width` 和 `height` 是原始（0°）图像的尺寸。置信度和类别保持不变。
  pub fn to_canonical(self, item: &DetectItem, width: f32, height: f32) -> DetectItem {
    let [x1, y1, x2, y2] = item.bbox;
    let bbox = match self {
      Orientation::Deg0 => [x1, y1, x2, y2],
      // 逆时针 90°：旋转画布的高等于原图的宽
      Orientation::Deg90 => [width - y2, x1, width - y1, x2],
      Orientation::Deg180 => [width - x2, height - y2, width - x1, height - y1],
      // 顺时针 90°：旋转画布的宽等于原图的高
      Orientation::Deg270 => [y1, height - x2, y2, height - x1],
    };
    DetectItem { bbox, ..*item }
  }

  /// `to_canonical` 的逆变换：原始图像坐标到旋转画布坐标
  pub fn from_canonical(self, item: &DetectItem, width: f32, height: f32) -> DetectItem {
    let [x1, y1, x2, y2] = item.bbox;
    let bbox = match self {
      Orientation::Deg0 => [x1, y1, x2, y2],
      Orientation::Deg90 => [y1, width - x2, y2, width - x1],
      Orientation::Deg180 => [width - x2, height - y2, width - x1, height - y1],
      Orientation::Deg270 => [height - y2, x1, height - y1, x2],
    };
    DetectItem { bbox, ..*item }
  }
}
