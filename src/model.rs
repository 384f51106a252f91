// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/model.rs - 模型
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

use serde::Serialize;

/// 目标检测模型（外部协作者）
///
/// 输出坐标位于输入图像自身的像素空间。
pub trait Model {
  type Input;
  type Error;

  fn infer(&self, input: &Self::Input, params: &InferParams) -> Result<DetectResult, Self::Error>;
}

/// 单次推理参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferParams {
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  /// 最长边缩放提示
  pub target_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

impl DetectItem {
  pub fn new(bbox: [f32; 4], score: f32, class_id: u32) -> Self {
    Self {
      class_id,
      score,
      bbox,
    }
  }

  pub fn area(&self) -> f32 {
    let [x1, y1, x2, y2] = self.bbox;
    (x2 - x1) * (y2 - y1)
  }

  pub fn center(&self) -> (f32, f32) {
    let [x1, y1, x2, y2] = self.bbox;
    ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
  }
}

impl AsRef<DetectItem> for DetectItem {
  fn as_ref(&self) -> &DetectItem {
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
  pub width: u32,
  pub height: u32,
}

impl DetectResult {
  pub fn new(items: Vec<DetectItem>, width: u32, height: u32) -> Self {
    Self {
      items: items.into_boxed_slice(),
      width,
      height,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Self;
}

/// PCB 缺陷类别数量
pub const PCB_CLASS_NUM: usize = 6;

/// PCB 缺陷类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcbLabel {
  MissingHole,
  MouseBite,
  OpenCircuit,
  Short,
  Spur,
  SpuriousCopper,
  Unknown(u32),
}

impl WithLabel for PcbLabel {
  fn to_label_str(&self) -> String {
    match self {
      PcbLabel::MissingHole => "missing_hole".to_string(),
      PcbLabel::MouseBite => "mouse_bite".to_string(),
      PcbLabel::OpenCircuit => "open_circuit".to_string(),
      PcbLabel::Short => "short".to_string(),
      PcbLabel::Spur => "spur".to_string(),
      PcbLabel::SpuriousCopper => "spurious_copper".to_string(),
      PcbLabel::Unknown(id) => format!("class_{}", id),
    }
  }

  fn to_label_id(&self) -> u32 {
    match self {
      PcbLabel::MissingHole => 0,
      PcbLabel::MouseBite => 1,
      PcbLabel::OpenCircuit => 2,
      PcbLabel::Short => 3,
      PcbLabel::Spur => 4,
      PcbLabel::SpuriousCopper => 5,
      PcbLabel::Unknown(id) => *id,
    }
  }

  fn from_label_id(id: u32) -> Self {
    match id {
      0 => PcbLabel::MissingHole,
      1 => PcbLabel::MouseBite,
      2 => PcbLabel::OpenCircuit,
      3 => PcbLabel::Short,
      4 => PcbLabel::Spur,
      5 => PcbLabel::SpuriousCopper,
      other => PcbLabel::Unknown(other),
    }
  }
}

mod cluster;
mod ensemble;
mod iou;
mod orientation;
mod vote;
#[cfg(feature = "model_yolo26")]
mod yolo26;

pub use self::cluster::{Cluster, cluster};
pub use self::ensemble::{
  Candidate, Ensemble, EnsembleConfig, EnsembleError, Prediction, Trace, TraceRecord,
};
pub use self::iou::iou;
pub use self::vote::fuse;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{Yolo26, Yolo26Builder, Yolo26Error};
