// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/report.rs - 缺陷检测报告
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

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{DetectItem, Prediction, Trace, WithLabel};

const SEVERE_SCORE: f32 = 0.8;
const MODERATE_SCORE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Severe,
  Moderate,
  Minor,
}

impl Severity {
  pub fn from_score(score: f32) -> Self {
    if score > SEVERE_SCORE {
      Severity::Severe
    } else if score > MODERATE_SCORE {
      Severity::Moderate
    } else {
      Severity::Minor
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
  pub x: i32,
  pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelBox {
  pub x1: i32,
  pub y1: i32,
  pub x2: i32,
  pub y2: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Defect {
  #[serde(rename = "type")]
  pub kind: String,
  pub class_id: u32,
  /// 框中心
  pub position: Position,
  pub bbox: PixelBox,
  /// 百分比，保留两位小数
  pub confidence: f32,
  pub severity: Severity,
}

impl Defect {
  pub fn from_item<T: WithLabel>(item: &DetectItem) -> Self {
    let [x1, y1, x2, y2] = item.bbox;
    let (cx, cy) = item.center();
    Self {
      kind: T::from_label_id(item.class_id).to_label_str(),
      class_id: item.class_id,
      position: Position {
        x: cx as i32,
        y: cy as i32,
      },
      bbox: PixelBox {
        x1: x1 as i32,
        y1: y1 as i32,
        x2: x2 as i32,
        y2: y2 as i32,
      },
      confidence: round2(item.score * 100.0),
      severity: Severity::from_score(item.score),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
  pub total_defects: usize,
  pub defect_types: BTreeMap<String, usize>,
  /// 平均置信度（百分比）
  pub accuracy: f32,
}

impl Statistics {
  pub fn from_defects(defects: &[Defect]) -> Self {
    let mut defect_types = BTreeMap::new();
    for defect in defects {
      *defect_types.entry(defect.kind.clone()).or_insert(0) += 1;
    }

    let accuracy = if defects.is_empty() {
      0.0
    } else {
      round2(defects.iter().map(|d| d.confidence).sum::<f32>() / defects.len() as f32)
    };

    Self {
      total_defects: defects.len(),
      defect_types,
      accuracy,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageDimensions {
  pub width: u32,
  pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefectReport {
  pub defects: Vec<Defect>,
  pub statistics: Statistics,
  pub image_dimensions: ImageDimensions,
  pub orientation_count: usize,
  pub vote_threshold: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub trace: Option<Trace>,
}

impl DefectReport {
  pub fn from_prediction<T: WithLabel>(prediction: &Prediction, with_trace: bool) -> Self {
    let defects: Vec<Defect> = prediction
      .detections
      .items
      .iter()
      .map(Defect::from_item::<T>)
      .collect();
    let statistics = Statistics::from_defects(&defects);

    Self {
      defects,
      statistics,
      image_dimensions: ImageDimensions {
        width: prediction.detections.width,
        height: prediction.detections.height,
      },
      orientation_count: prediction.orientation_count,
      vote_threshold: prediction.vote_threshold,
      trace: with_trace.then(|| prediction.trace.clone()),
    }
  }

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}

fn round2(value: f32) -> f32 {
  (value * 100.0).round() / 100.0
}
