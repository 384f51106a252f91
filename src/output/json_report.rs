// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/output/json_report.rs - JSON 缺陷报告输出
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

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, has_query_flag,
  model::{Prediction, WithLabel},
  output::Render,
  report::DefectReport,
};

#[derive(Error, Debug)]
pub enum JsonReportError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 将融合结果写成 JSON 报告，`?trace` 时附带各阶段诊断信息
pub struct JsonReportOutput<T> {
  path: PathBuf,
  with_trace: bool,
  _label: PhantomData<fn() -> T>,
}

impl<T> FromUrlWithScheme for JsonReportOutput<T> {
  const SCHEME: &'static str = "json";
}

impl<T> FromUrl for JsonReportOutput<T> {
  type Error = JsonReportError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonReportError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(JsonReportOutput {
      path: PathBuf::from(uri.path()),
      with_trace: has_query_flag(uri, "trace"),
      _label: PhantomData,
    })
  }
}

impl<T: WithLabel> JsonReportOutput<T> {
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn write_report(&self, prediction: &Prediction) -> Result<(), JsonReportError> {
    write_report::<T>(&self.path, prediction, self.with_trace)?;
    info!("保存检测报告到文件: {}", self.path.display());
    Ok(())
  }
}

/// 生成报告并写入指定路径，父目录不存在时自动创建
pub(crate) fn write_report<T: WithLabel>(
  path: &Path,
  prediction: &Prediction,
  with_trace: bool,
) -> Result<(), JsonReportError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }

  let report = DefectReport::from_prediction::<T>(prediction, with_trace);
  std::fs::write(path, report.to_json()?)?;
  Ok(())
}

impl<T: WithLabel> Render<RgbImage, Prediction> for JsonReportOutput<T> {
  type Error = JsonReportError;

  fn render_result(&self, _frame: &RgbImage, result: &Prediction) -> Result<(), Self::Error> {
    self.write_report(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{DetectItem, DetectResult, PcbLabel, Trace, TraceRecord};

  fn prediction() -> Prediction {
    Prediction {
      detections: DetectResult::new(vec![DetectItem::new([10.0, 10.0, 50.0, 50.0], 0.9, 2)], 100, 80),
      orientation_count: 2,
      vote_threshold: Some(1),
      trace: Trace {
        records: vec![TraceRecord::VoteThresholdAdjusted {
          requested: 3,
          effective: 1,
        }],
      },
    }
  }

  #[test]
  fn writes_report_into_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports/board.json");
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let output = JsonReportOutput::<PcbLabel>::from_url(&url).unwrap();

    output.render_result(&RgbImage::new(100, 80), &prediction()).unwrap();

    let json: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["defects"][0]["type"], "open_circuit");
    assert_eq!(json["statistics"]["total_defects"], 1);
    assert_eq!(json["image_dimensions"]["width"], 100);
    assert_eq!(json["vote_threshold"], 1);
    assert!(json.get("trace").is_none());
  }

  #[test]
  fn trace_flag_adds_stage_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.json");
    let url = Url::parse(&format!("json://{}?trace", path.display())).unwrap();
    let output = JsonReportOutput::<PcbLabel>::from_url(&url).unwrap();

    output.render_result(&RgbImage::new(100, 80), &prediction()).unwrap();

    let json: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let record = &json["trace"]["records"][0];
    assert_eq!(record["stage"], "vote_threshold_adjusted");
    assert_eq!(record["requested"], 3);
    assert_eq!(record["effective"], 1);
  }

  #[test]
  fn other_schemes_are_rejected() {
    let url = Url::parse("image:///tmp/out.png").unwrap();
    assert!(matches!(
      JsonReportOutput::<PcbLabel>::from_url(&url),
      Err(JsonReportError::SchemeMismatch(_))
    ));
  }
}
