// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/args.rs - 集成推理命令行参数
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

use clap::Args;

use crate::model::EnsembleConfig;

/// 多方向投票参数
#[derive(Args, Debug, Clone)]
pub struct EnsembleArgs {
  /// 推理方向数量（1、2 或 4）
  #[arg(long, default_value_t = 4, value_name = "COUNT")]
  pub orientations: usize,

  /// 保留一个检测结果所需的最少票数
  #[arg(long, default_value_t = 3, value_name = "VOTES")]
  pub vote_threshold: usize,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.4, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.45, value_name = "THRESHOLD")]
  pub iou: f32,

  /// 聚类 IOU 阈值，默认与 NMS 阈值相同
  #[arg(long, value_name = "THRESHOLD")]
  pub cluster_iou: Option<f32>,

  /// 推理尺寸
  #[arg(long, default_value_t = 600, value_name = "PIXELS")]
  pub target_size: u32,
}

impl EnsembleArgs {
  pub fn to_config(&self) -> EnsembleConfig {
    EnsembleConfig::default()
      .with_orientation_count(self.orientations)
      .with_vote_threshold(self.vote_threshold)
      .with_confidence_threshold(self.confidence)
      .with_iou_threshold(self.iou)
      .with_cluster_iou_threshold(self.cluster_iou)
      .with_target_size(self.target_size)
  }
}
