// 该文件是 Duojiao （多角投票） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像多方向投票推理
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use duojiao::{
  FromUrl,
  args::EnsembleArgs,
  input::InputWrapper,
  model::{Ensemble, PcbLabel, Yolo26Builder},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// Duojiao 单帧推理参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// RKNN 模型文件，例如 yolo26:///path/model.rknn
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///path/board.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 json:///path/report.json?trace
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  #[command(flatten)]
  pub ensemble: EnsembleArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let config = args.ensemble.to_config();
  info!("集成参数: {:?}", config);

  let input = InputWrapper::from_url(&args.input)?;
  let model = Yolo26Builder::from_url(&args.model)?.build()?;
  let output = OutputWrapper::<PcbLabel>::from_url(&args.output)?;

  OneShotTask.run_task(input, Ensemble::new(model, config), output)?;

  Ok(())
}
