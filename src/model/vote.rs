// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/model/vote.rs - 投票融合
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

use crate::model::{Cluster, DetectItem};

/// 票数不少于 `vote_threshold` 的组融合为一个检测框，其余组丢弃
///
/// 坐标和置信度取算术平均，类别沿用种子。
pub fn fuse<T: AsRef<DetectItem>>(clusters: &[Cluster<T>], vote_threshold: usize) -> Vec<DetectItem> {
  clusters
    .iter()
    .filter(|cluster| !cluster.is_empty() && cluster.len() >= vote_threshold)
    .map(average)
    .collect()
}

fn average<T: AsRef<DetectItem>>(cluster: &Cluster<T>) -> DetectItem {
  let count = cluster.len() as f32;
  let mut bbox = [0.0f32; 4];
  let mut score = 0.0f32;
  for member in cluster.members.iter().map(AsRef::as_ref) {
    for (acc, v) in bbox.iter_mut().zip(member.bbox) {
      *acc += v;
    }
    score += member.score;
  }

  DetectItem {
    class_id: cluster.seed().as_ref().class_id,
    score: score / count,
    bbox: bbox.map(|v| v / count),
  }
}
