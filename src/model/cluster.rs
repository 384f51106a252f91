// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/model/cluster.rs - 检测框聚类
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

use crate::model::{DetectItem, iou};

/// 一组相互重叠的检测框，第一个成员为种子
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster<T> {
  pub members: Vec<T>,
}

impl<T: AsRef<DetectItem>> Cluster<T> {
  pub fn seed(&self) -> &T {
    // 聚类从种子开始构造，members 不会为空
    &self.members[0]
  }

  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }
}

/// 贪心聚类
///
/// 每轮取剩余序列的第一个框作为种子，把与种子 IoU 严格大于阈值的框并入该组。
/// 只比较种子，不做传递闭包：同组的两个非种子成员之间不一定重叠。
pub fn cluster<T>(items: &[T], iou_threshold: f32) -> Vec<Cluster<T>>
where
  T: AsRef<DetectItem> + Clone,
{
  let mut remaining: Vec<T> = items.to_vec();
  let mut clusters = Vec::new();

  while !remaining.is_empty() {
    let seed = remaining.remove(0);
    let (similar, rest): (Vec<T>, Vec<T>) = remaining
      .into_iter()
      .partition(|item| iou(seed.as_ref(), item.as_ref()) > iou_threshold);
    remaining = rest;

    let mut members = Vec::with_capacity(similar.len() + 1);
    members.push(seed);
    members.extend(similar);
    clusters.push(Cluster { members });
  }

  clusters
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(bbox: [f32; 4], class_id: u32) -> DetectItem {
    DetectItem::new(bbox, 0.9, class_id)
  }

  #[test]
  fn empty_input_gives_no_clusters() {
    let clusters = cluster::<DetectItem>(&[], 0.5);
    assert!(clusters.is_empty());
  }

  #[test]
  fn repeated_box_forms_single_cluster() {
    let boxes = vec![item([10.0, 10.0, 50.0, 50.0], 0); 4];
    for threshold in [0.0, 0.45, 0.99] {
      let clusters = cluster(&boxes, threshold);
      assert_eq!(clusters.len(), 1);
      assert_eq!(clusters[0].len(), 4);
    }
  }

  #[test]
  fn disjoint_boxes_stay_apart_in_input_order() {
    let boxes = vec![
      item([0.0, 0.0, 10.0, 10.0], 0),
      item([100.0, 100.0, 110.0, 110.0], 1),
      item([1.0, 1.0, 10.0, 10.0], 2),
    ];
    let clusters = cluster(&boxes, 0.5);
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].members.iter().map(|b| b.class_id).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(clusters[1].seed().class_id, 1);
  }

  #[test]
  fn threshold_is_strict() {
    // IoU 恰好为 0.5
    let a = item([0.0, 0.0, 20.0, 10.0], 0);
    let b = item([0.0, 0.0, 10.0, 10.0], 1);
    assert_eq!(cluster(&[a, b], 0.5).len(), 2);
    assert_eq!(cluster(&[a, b], 0.49).len(), 1);
  }

  #[test]
  fn earliest_box_is_seed() {
    let boxes = vec![
      item([0.0, 0.0, 10.0, 10.0], 7),
      item([0.0, 0.0, 10.0, 10.0], 3),
    ];
    let clusters = cluster(&boxes, 0.5);
    assert_eq!(clusters[0].seed().class_id, 7);
  }

  #[test]
  fn grouping_links_to_seed_only() {
    // a 与 b、b 与 c 重叠，但 a 与 c 不重叠：c 不会通过 b 并入 a 的组
    let a = item([0.0, 0.0, 10.0, 10.0], 0);
    let b = item([2.0, 0.0, 12.0, 10.0], 1);
    let c = item([6.0, 0.0, 16.0, 10.0], 2);
    let clusters = cluster(&[a, b, c], 0.3);
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].members, vec![a, b]);
    assert_eq!(clusters[1].members, vec![c]);
  }

  #[test]
  fn members_need_not_overlap_each_other() {
    // 种子较大，两侧的小框都与种子重叠，但彼此不相交
    let seed = item([0.0, 0.0, 20.0, 10.0], 0);
    let left = item([0.0, 0.0, 12.0, 10.0], 1);
    let right = item([8.0, 0.0, 20.0, 10.0], 2);
    let clusters = cluster(&[seed, left, right], 0.5);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].len(), 3);
    assert!(iou(&left, &right) < 0.5);
  }
}
