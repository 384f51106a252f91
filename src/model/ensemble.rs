// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/model/ensemble.rs - 多方向集成推理
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
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  frame::{ORIENTATION_ORDER, Orientation, OrientedFrame},
  model::{Cluster, DetectItem, DetectResult, InferParams, Model, cluster, fuse},
};

const DEFAULT_ORIENTATION_COUNT: usize = 4;
const DEFAULT_VOTE_THRESHOLD: usize = 3;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_TARGET_SIZE: u32 = 600;

#[derive(Error, Debug)]
pub enum EnsembleError<E> {
  #[error("方向数量必须为 1、2 或 4，实际为 {0}")]
  InvalidOrientationCount(usize),
  #[error("{orientation} 方向推理失败: {source}")]
  Inference {
    orientation: Orientation,
    #[source]
    source: E,
  },
}

/// 集成推理参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleConfig {
  /// 推理方向数量，只能为 1、2 或 4
  pub orientation_count: usize,
  /// 一个检测结果至少需要的票数
  pub vote_threshold: usize,
  pub confidence_threshold: f32,
  /// 模型内部 NMS 使用的 IoU 阈值
  pub iou_threshold: f32,
  /// 聚类 IoU 阈值，未设置时沿用 `iou_threshold`
  pub cluster_iou_threshold: Option<f32>,
  pub target_size: u32,
}

impl Default for EnsembleConfig {
  fn default() -> Self {
    Self {
      orientation_count: DEFAULT_ORIENTATION_COUNT,
      vote_threshold: DEFAULT_VOTE_THRESHOLD,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      cluster_iou_threshold: None,
      target_size: DEFAULT_TARGET_SIZE,
    }
  }
}

impl EnsembleConfig {
  pub fn with_orientation_count(mut self, count: usize) -> Self {
    self.orientation_count = count;
    self
  }

  pub fn with_vote_threshold(mut self, threshold: usize) -> Self {
    self.vote_threshold = threshold;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_cluster_iou_threshold(mut self, threshold: Option<f32>) -> Self {
    self.cluster_iou_threshold = threshold;
    self
  }

  pub fn with_target_size(mut self, size: u32) -> Self {
    self.target_size = size;
    self
  }

  /// 按固定顺序返回需要推理的方向
  pub fn orientations(&self) -> Option<&'static [Orientation]> {
    match self.orientation_count {
      1 | 2 | 4 => Some(&ORIENTATION_ORDER[..self.orientation_count]),
      _ => None,
    }
  }

  /// 两个方向时票数阈值大于 2 会被降为 1
  pub fn effective_vote_threshold(&self) -> usize {
    if self.orientation_count == 2 && self.vote_threshold > 2 {
      1
    } else {
      self.vote_threshold
    }
  }

  pub fn cluster_iou(&self) -> f32 {
    self.cluster_iou_threshold.unwrap_or(self.iou_threshold)
  }

  pub fn infer_params(&self) -> InferParams {
    InferParams {
      confidence_threshold: self.confidence_threshold,
      iou_threshold: self.iou_threshold,
      target_size: self.target_size,
    }
  }
}

/// 带来源方向的候选框，坐标已在原始图像坐标系中
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
  pub orientation: Orientation,
  #[serde(flatten)]
  pub item: DetectItem,
}

impl AsRef<DetectItem> for Candidate {
  fn as_ref(&self) -> &DetectItem {
    &self.item
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum TraceRecord {
  VoteThresholdAdjusted {
    requested: usize,
    effective: usize,
  },
  SingleOrientation,
  OrientationPass {
    orientation: Orientation,
    /// 旋转画布坐标
    raw: Vec<DetectItem>,
    /// 原始图像坐标
    canonical: Vec<DetectItem>,
  },
  Clusters {
    clusters: Vec<Cluster<Candidate>>,
  },
  Fused {
    items: Vec<DetectItem>,
  },
}

/// 按阶段顺序记录的诊断信息
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
  pub records: Vec<TraceRecord>,
}

impl Trace {
  fn push(&mut self, record: TraceRecord) {
    self.records.push(record);
  }

  pub fn vote_adjustment(&self) -> Option<(usize, usize)> {
    self.records.iter().find_map(|record| match record {
      TraceRecord::VoteThresholdAdjusted {
        requested,
        effective,
      } => Some((*requested, *effective)),
      _ => None,
    })
  }

  pub fn passes(&self) -> impl Iterator<Item = (Orientation, &[DetectItem], &[DetectItem])> {
    self.records.iter().filter_map(|record| match record {
      TraceRecord::OrientationPass {
        orientation,
        raw,
        canonical,
      } => Some((*orientation, raw.as_slice(), canonical.as_slice())),
      _ => None,
    })
  }

  pub fn clusters(&self) -> Option<&[Cluster<Candidate>]> {
    self.records.iter().find_map(|record| match record {
      TraceRecord::Clusters { clusters } => Some(clusters.as_slice()),
      _ => None,
    })
  }
}

/// 一次集成推理的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
  pub detections: DetectResult,
  pub orientation_count: usize,
  /// 实际使用的票数阈值，单方向推理时不投票
  pub vote_threshold: Option<usize>,
  pub trace: Trace,
}

/// 多方向投票集成检测器
///
/// 本身不保存跨调用状态，每次 `predict` 都是独立的。
pub struct Ensemble<M> {
  model: M,
  config: EnsembleConfig,
}

impl<M> Ensemble<M> {
  pub fn new(model: M, config: EnsembleConfig) -> Self {
    Self { model, config }
  }

  pub fn config(&self) -> &EnsembleConfig {
    &self.config
  }

  pub fn model(&self) -> &M {
    &self.model
  }
}

impl<F, M> Ensemble<M>
where
  F: OrientedFrame,
  M: Model<Input = F>,
{
  pub fn predict(&self, image: &F) -> Result<Prediction, EnsembleError<M::Error>> {
    self.predict_with(image, &self.config)
  }

  pub fn predict_with(
    &self,
    image: &F,
    config: &EnsembleConfig,
  ) -> Result<Prediction, EnsembleError<M::Error>> {
    let orientations = config
      .orientations()
      .ok_or(EnsembleError::InvalidOrientationCount(config.orientation_count))?;

    let mut trace = Trace::default();
    let vote_threshold = config.effective_vote_threshold();
    if vote_threshold != config.vote_threshold {
      warn!(
        "方向数量为 {} 但票数阈值为 {}，票数阈值调整为 {}",
        config.orientation_count, config.vote_threshold, vote_threshold
      );
      trace.push(TraceRecord::VoteThresholdAdjusted {
        requested: config.vote_threshold,
        effective: vote_threshold,
      });
    }

    let params = config.infer_params();
    let (width, height) = image.dimensions();

    if orientations.len() == 1 {
      info!("仅使用原始方向推理（不集成）");
      trace.push(TraceRecord::SingleOrientation);
      let result = self.run_pass(image, Orientation::Deg0, &params)?;
      log_items("原始方向 (0°) 检测结果", &result.items);
      trace.push(TraceRecord::OrientationPass {
        orientation: Orientation::Deg0,
        raw: result.items.to_vec(),
        canonical: result.items.to_vec(),
      });
      return Ok(Prediction {
        detections: result,
        orientation_count: config.orientation_count,
        vote_threshold: None,
        trace,
      });
    }

    let mut candidates = Vec::new();
    for &orientation in orientations {
      let result = self.run_pass(image, orientation, &params)?;
      let canonical: Vec<DetectItem> = result
        .items
        .iter()
        .map(|item| orientation.to_canonical(item, width as f32, height as f32))
        .collect();
      log_items(&format!("{} 方向检测结果（已映射回原始坐标）", orientation), &canonical);

      candidates.extend(
        canonical
          .iter()
          .map(|&item| Candidate { orientation, item }),
      );
      trace.push(TraceRecord::OrientationPass {
        orientation,
        raw: result.items.into_vec(),
        canonical,
      });
    }

    let clusters = cluster(&candidates, config.cluster_iou());
    debug!("聚合分组: {} 组", clusters.len());
    for (idx, group) in clusters.iter().enumerate() {
      debug!("第 {} 组: {} 个框", idx + 1, group.len());
      for candidate in group.members.iter() {
        debug!("  [{}] {}", candidate.orientation, format_item(&candidate.item));
      }
    }

    let fused = fuse(&clusters, vote_threshold);
    log_items("投票融合结果", &fused);
    info!(
      "{} 个方向共 {} 个候选框，{} 组，投票后保留 {} 个",
      orientations.len(),
      candidates.len(),
      clusters.len(),
      fused.len()
    );

    trace.push(TraceRecord::Clusters { clusters });
    trace.push(TraceRecord::Fused {
      items: fused.clone(),
    });

    Ok(Prediction {
      detections: DetectResult::new(fused, width, height),
      orientation_count: config.orientation_count,
      vote_threshold: Some(vote_threshold),
      trace,
    })
  }

  fn run_pass(
    &self,
    image: &F,
    orientation: Orientation,
    params: &InferParams,
  ) -> Result<DetectResult, EnsembleError<M::Error>> {
    debug!("开始 {} 方向推理", orientation);
    let result = match orientation {
      Orientation::Deg0 => self.model.infer(image, params),
      _ => self.model.infer(&image.rotate(orientation), params),
    }
    .map_err(|source| EnsembleError::Inference {
      orientation,
      source,
    })?;

    let (width, height) = image.dimensions();
    let expected = orientation.rotated_dimensions(width, height);
    if (result.width, result.height) != expected {
      warn!(
        "{} 方向模型报告的图像尺寸 {}x{} 与期望 {}x{} 不一致",
        orientation, result.width, result.height, expected.0, expected.1
      );
    }

    Ok(result)
  }
}

fn format_item(item: &DetectItem) -> String {
  format!(
    "Class: {}, Coords: [{:.1}, {:.1}, {:.1}, {:.1}], Conf: {:.3}",
    item.class_id, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3], item.score
  )
}

fn log_items(title: &str, items: &[DetectItem]) {
  debug!("--- {} ---", title);
  for item in items {
    debug!("{}", format_item(item));
  }
}
