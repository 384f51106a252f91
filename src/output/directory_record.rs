// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme, has_query_flag,
  model::{Prediction, WithLabel},
  output::{
    Render,
    draw::Draw,
    json_report::{JsonReportError, write_report},
  },
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("报告错误: {0}")]
  ReportError(#[from] JsonReportError),
}

/// 按日期分目录保存标注图像和对应的 JSON 报告
///
/// 路径形如 `<dir>/YYYY/MM/DD/HH-MM-SS-NNNN.png`，报告与图像同名，扩展名为 `.json`。
/// 默认跳过没有检测结果的帧，`?always` 时全部保存。
pub struct DirectoryRecordOutput<T> {
  directory: PathBuf,
  draw: Draw,
  frame_counters: Arc<Mutex<u16>>,
  always: bool,
  with_trace: bool,
  _label: PhantomData<fn() -> T>,
}

impl<T> FromUrlWithScheme for DirectoryRecordOutput<T> {
  const SCHEME: &'static str = "folder";
}

impl<T> FromUrl for DirectoryRecordOutput<T> {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw: Draw::default(),
      frame_counters: Arc::new(Mutex::new(0)),
      always: has_query_flag(uri, "always"),
      with_trace: has_query_flag(uri, "trace"),
      _label: PhantomData,
    })
  }
}

impl<T> DirectoryRecordOutput<T> {
  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn frame_id(&self) -> u16 {
    // 计数器只在本输出内部使用，锁中毒时继续沿用其中的值
    let mut counter = match self.frame_counters.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl<T: WithLabel> Render<RgbImage, Prediction> for DirectoryRecordOutput<T> {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &Prediction) -> Result<(), Self::Error> {
    if !self.always && result.detections.is_empty() {
      debug!("无检测结果，跳过记录");
      return Ok(());
    }

    let path = self.frame_path()?;
    self
      .draw
      .draw_detection(frame, &result.detections)
      .save(&path)?;
    write_report::<T>(&path.with_extension("json"), result, self.with_trace)?;
    info!("记录检测结果到: {}", path.display());

    Ok(())
  }
}
