// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::model::{DetectItem, DetectResult};

const BOX_THICKNESS: i32 = 2;

// 按类别循环使用的边框颜色
const CLASS_COLORS: [[u8; 3]; 6] = [
  [255, 56, 56],
  [255, 157, 151],
  [255, 112, 31],
  [255, 178, 29],
  [72, 249, 10],
  [0, 194, 255],
];

pub struct Draw {
  thickness: i32,
  palette: Vec<[u8; 3]>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: BOX_THICKNESS,
      palette: CLASS_COLORS.to_vec(),
    }
  }
}

impl Draw {
  pub fn with_thickness(mut self, thickness: i32) -> Self {
    self.thickness = thickness.max(1);
    self
  }

  pub fn color_of(&self, class_id: u32) -> [u8; 3] {
    self.palette[class_id as usize % self.palette.len()]
  }

  /// 在图像上绘制一个像素坐标的矩形边框，超出图像的部分被裁剪
  fn draw_bbox(&self, image: &mut RgbImage, item: &DetectItem) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (item.bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (item.bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (item.bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (item.bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(self.color_of(item.class_id));
    for t in 0..self.thickness {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32 + 1, height as u32 + 1);
      draw_hollow_rect_mut(image, rect, color);
    }
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result.items.iter() {
      self.draw_bbox(image, item);
    }
  }

  pub fn draw_detection(&self, frame: &RgbImage, result: &DetectResult) -> RgbImage {
    let mut image = frame.clone();
    self.draw_detections_on_image(&mut image, result);
    image
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn box_outline_is_drawn_in_class_color() {
    let draw = Draw::default();
    let frame = RgbImage::new(40, 40);
    let result = DetectResult::new(vec![DetectItem::new([5.0, 5.0, 20.0, 20.0], 0.9, 4)], 40, 40);
    let image = draw.draw_detection(&frame, &result);

    let color = Rgb(draw.color_of(4));
    assert_eq!(image.get_pixel(5, 5), &color);
    assert_eq!(image.get_pixel(20, 12), &color);
    assert_eq!(image.get_pixel(6, 12), &color);
    assert_eq!(image.get_pixel(12, 12), &Rgb([0, 0, 0]));
    // 原图不变
    assert_eq!(frame.get_pixel(5, 5), &Rgb([0, 0, 0]));
  }

  #[test]
  fn boxes_outside_the_image_are_ignored() {
    let draw = Draw::default();
    let frame = RgbImage::new(10, 10);
    let result = DetectResult::new(
      vec![DetectItem::new([50.0, 50.0, 80.0, 80.0], 0.9, 0)],
      10,
      10,
    );
    assert_eq!(draw.draw_detection(&frame, &result), frame);
  }
}
