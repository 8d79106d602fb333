// 该文件是 Jianwei （见微） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理基准测试
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
use url::Url;

use jianwei::{
  FromUrl,
  input::ImageSource,
  labels::ClassTable,
  model::{ModelVariant, ReplayLoader, Thresholds},
  session::{DetectionService, Session, Settings},
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// 重复推理基准测试
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源
  #[arg(long, value_name = "MODEL_SOURCE")]
  pub model_source: Url,
  /// 模型规模
  #[arg(long, value_enum, default_value_t = ModelVariant::Nano)]
  pub model: ModelVariant,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: String,
  /// 重复次数
  #[arg(long, default_value_t = 100, value_name = "COUNT")]
  pub repeat: usize,
  /// 记录每次推理耗时
  #[arg(long)]
  pub debug: bool,
}

fn main() -> Result<()> {
  let args = Args::parse();
  jianwei::init_tracing(args.debug);

  info!("模型来源: {}", args.model_source);
  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("重复次数: {}", args.repeat);

  let loader = ReplayLoader::from_url(&args.model_source)?;
  let service = DetectionService::new(loader, ClassTable::coco());
  let mut session = Session::new(Settings {
    model: args.model,
    thresholds: Thresholds::default(),
    debug: args.debug,
    ..Settings::default()
  });

  let source = ImageSource::parse(&args.input)?;
  RepeatShotTask::new(source, args.repeat).run_task(&service, &mut session)?;

  Ok(())
}
