// 该文件是 Duojiao （多角投票） 项目的一部分。
// tests/ensemble.rs - 多方向投票端到端测试
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

use std::convert::Infallible;

use approx::assert_relative_eq;
use image::{Rgb, RgbImage};
use url::Url;

use duojiao::{
  FromUrl,
  frame::Orientation,
  input::ImageFileInput,
  model::{
    DetectItem, DetectResult, Ensemble, EnsembleConfig, EnsembleError, InferParams, Model,
    PcbLabel,
  },
  output::JsonReportOutput,
  task::{OneShotTask, Task},
};

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// 按颜色寻找色块的检测器，色块外接矩形即检测框
struct BlobDetector {
  targets: Vec<(Rgb<u8>, u32)>,
  score: f32,
  /// 竖向画布上什么也看不到
  blind_when_portrait: bool,
}

impl BlobDetector {
  fn new(targets: Vec<(Rgb<u8>, u32)>) -> Self {
    Self {
      targets,
      score: 0.9,
      blind_when_portrait: false,
    }
  }
}

impl Model for BlobDetector {
  type Input = RgbImage;
  type Error = Infallible;

  fn infer(&self, input: &RgbImage, _params: &InferParams) -> Result<DetectResult, Infallible> {
    let (width, height) = input.dimensions();
    if self.blind_when_portrait && height > width {
      return Ok(DetectResult::new(Vec::new(), width, height));
    }

    let mut items = Vec::new();
    for &(color, class_id) in &self.targets {
      let mut bounds: Option<[u32; 4]> = None;
      for (x, y, pixel) in input.enumerate_pixels() {
        if *pixel != color {
          continue;
        }
        let b = bounds.get_or_insert([x, y, x, y]);
        b[0] = b[0].min(x);
        b[1] = b[1].min(y);
        b[2] = b[2].max(x);
        b[3] = b[3].max(y);
      }
      if let Some([x1, y1, x2, y2]) = bounds {
        items.push(DetectItem::new(
          [x1 as f32, y1 as f32, (x2 + 1) as f32, (y2 + 1) as f32],
          self.score,
          class_id,
        ));
      }
    }
    Ok(DetectResult::new(items, width, height))
  }
}

fn board(width: u32, height: u32, blobs: &[(Rgb<u8>, [u32; 4])]) -> RgbImage {
  let mut image = RgbImage::new(width, height);
  for &(color, [x1, y1, x2, y2]) in blobs {
    for y in y1..y2 {
      for x in x1..x2 {
        image.put_pixel(x, y, color);
      }
    }
  }
  image
}

fn assert_item(item: &DetectItem, bbox: [f32; 4], score: f32, class_id: u32) {
  for (actual, expected) in item.bbox.iter().zip(bbox.iter()) {
    assert_relative_eq!(*actual, *expected, epsilon = 1e-4);
  }
  assert_relative_eq!(item.score, score, epsilon = 1e-6);
  assert_eq!(item.class_id, class_id);
}

#[test]
fn four_orientations_recover_the_original_box() {
  let image = board(100, 100, &[(RED, [10, 10, 50, 50])]);
  let ensemble = Ensemble::new(BlobDetector::new(vec![(RED, 0)]), EnsembleConfig::default());

  let prediction = ensemble.predict(&image).unwrap();

  assert_eq!(prediction.vote_threshold, Some(3));
  assert_eq!(prediction.detections.len(), 1);
  assert_item(&prediction.detections.items[0], [10.0, 10.0, 50.0, 50.0], 0.9, 0);

  let passes: Vec<_> = prediction.trace.passes().collect();
  assert_eq!(passes.len(), 4);
  assert_eq!(passes[1].0, Orientation::Deg90);
  // 旋转画布上的原始框与映射回来的框不同
  assert_ne!(passes[1].1, passes[1].2);
  for (_, _, canonical) in passes {
    assert_item(&canonical[0], [10.0, 10.0, 50.0, 50.0], 0.9, 0);
  }
  assert_eq!(prediction.trace.clusters().map(|c| c.len()), Some(1));
}

#[test]
fn non_square_boards_map_back_exactly() {
  let image = board(120, 80, &[(RED, [20, 10, 60, 30]), (GREEN, [90, 50, 110, 75])]);
  let ensemble = Ensemble::new(
    BlobDetector::new(vec![(RED, 3), (GREEN, 5)]),
    EnsembleConfig::default(),
  );

  let prediction = ensemble.predict(&image).unwrap();

  assert_eq!((prediction.detections.width, prediction.detections.height), (120, 80));
  assert_eq!(prediction.detections.len(), 2);
  assert_item(&prediction.detections.items[0], [20.0, 10.0, 60.0, 30.0], 0.9, 3);
  assert_item(&prediction.detections.items[1], [90.0, 50.0, 110.0, 75.0], 0.9, 5);
}

#[test]
fn boxes_seen_by_too_few_orientations_are_voted_out() {
  let image = board(120, 80, &[(RED, [20, 10, 60, 30])]);
  let mut detector = BlobDetector::new(vec![(RED, 0)]);
  detector.blind_when_portrait = true;
  let ensemble = Ensemble::new(detector, EnsembleConfig::default());

  // 只有 0° 和 180° 两票
  let prediction = ensemble.predict(&image).unwrap();
  assert!(prediction.detections.is_empty());

  let relaxed = EnsembleConfig::default().with_vote_threshold(2);
  let prediction = ensemble.predict_with(&image, &relaxed).unwrap();
  assert_eq!(prediction.detections.len(), 1);
  assert_item(&prediction.detections.items[0], [20.0, 10.0, 60.0, 30.0], 0.9, 0);
}

#[test]
fn two_orientations_lower_a_large_vote_threshold_to_one() {
  let image = board(64, 64, &[(RED, [8, 8, 24, 24])]);
  let config = EnsembleConfig::default()
    .with_orientation_count(2)
    .with_vote_threshold(5);
  let ensemble = Ensemble::new(BlobDetector::new(vec![(RED, 1)]), config);

  let prediction = ensemble.predict(&image).unwrap();

  assert_eq!(prediction.vote_threshold, Some(1));
  assert_eq!(prediction.trace.vote_adjustment(), Some((5, 1)));
  assert_eq!(prediction.trace.passes().count(), 2);
  assert_eq!(prediction.detections.len(), 1);
  assert_item(&prediction.detections.items[0], [8.0, 8.0, 24.0, 24.0], 0.9, 1);
}

#[test]
fn single_orientation_returns_the_raw_detector_output() {
  let image = board(50, 40, &[(RED, [5, 5, 15, 25]), (GREEN, [30, 10, 45, 20])]);
  let detector = BlobDetector::new(vec![(RED, 0), (GREEN, 2)]);
  let raw = detector
    .infer(&image, &EnsembleConfig::default().infer_params())
    .unwrap();
  let ensemble = Ensemble::new(detector, EnsembleConfig::default().with_orientation_count(1));

  let prediction = ensemble.predict(&image).unwrap();

  assert_eq!(prediction.detections, raw);
  assert_eq!(prediction.vote_threshold, None);
  assert_eq!(prediction.trace.passes().count(), 1);
}

#[test]
fn unsupported_orientation_count_is_rejected() {
  let image = board(10, 10, &[]);
  let ensemble = Ensemble::new(
    BlobDetector::new(vec![(RED, 0)]),
    EnsembleConfig::default().with_orientation_count(3),
  );
  assert!(matches!(
    ensemble.predict(&image),
    Err(EnsembleError::InvalidOrientationCount(3))
  ));
}

#[test]
fn one_shot_task_writes_a_defect_report() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("report.json");
  let url = Url::parse(&format!("json://{}?trace", path.display())).unwrap();
  let output = JsonReportOutput::<PcbLabel>::from_url(&url).unwrap();

  let image = board(100, 100, &[(RED, [10, 10, 50, 50])]);
  OneShotTask
    .run_task(
      ImageFileInput::from(image),
      Ensemble::new(BlobDetector::new(vec![(RED, 0)]), EnsembleConfig::default()),
      output,
    )
    .unwrap();

  let json: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
  let defect = &json["defects"][0];
  assert_eq!(defect["type"], "missing_hole");
  assert_eq!(defect["position"]["x"], 30);
  assert_eq!(defect["bbox"]["x2"], 50);
  assert_eq!(defect["severity"], "severe");
  assert_eq!(json["statistics"]["total_defects"], 1);
  assert_eq!(json["orientation_count"], 4);

  let stages: Vec<_> = json["trace"]["records"]
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["stage"].as_str().unwrap().to_string())
    .collect();
  assert_eq!(
    stages,
    [
      "orientation_pass",
      "orientation_pass",
      "orientation_pass",
      "orientation_pass",
      "clusters",
      "fused"
    ]
  );
}
