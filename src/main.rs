// 该文件是 Jianwei （见微） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use jianwei::{
  FromUrl,
  input::{ImageSource, SampleImage},
  labels::ClassTable,
  model::ReplayLoader,
  output::{SaveImageFileOutput, record::RecordOutput, report::ModelInfoTable},
  session::{DetectionService, Session},
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  let args = args::Args::parse();
  jianwei::init_tracing(args.debug);

  if args.list_models {
    print!("{}", ModelInfoTable);
    return Ok(());
  }
  if args.list_samples {
    for sample in SampleImage::ALL {
      println!("{:<12} {}", sample.name(), sample.title());
    }
    return Ok(());
  }

  let model_source = args
    .model_source
    .as_ref()
    .ok_or_else(|| anyhow::anyhow!("缺少模型来源"))?;
  let input = args
    .input
    .as_deref()
    .ok_or_else(|| anyhow::anyhow!("缺少输入来源"))?;
  let settings = args.settings()?;

  info!("模型来源: {}", model_source);
  info!("模型: {} ({})", settings.model, settings.model.info().name);
  info!("输入来源: {}", input);
  info!(
    "置信度阈值: {}, IoU 阈值: {}",
    settings.thresholds.confidence(),
    settings.thresholds.iou()
  );

  let class_table = match &args.classes {
    Some(path) => ClassTable::from_file(path)?,
    None => ClassTable::coco(),
  };
  let loader = ReplayLoader::from_url(model_source)?;
  let service = DetectionService::new(loader, class_table);

  let source = ImageSource::parse(input)?;
  let output = args
    .output
    .as_ref()
    .map(|url| -> Result<_> {
      let output = SaveImageFileOutput::from_url(url)?;
      Ok(output.with_draw(settings.renderer()?))
    })
    .transpose()?;
  let record = args.record.clone().map(RecordOutput::new);

  let mut session = Session::new(settings);
  OneShotTask::new(source)
    .with_output(output)
    .with_record(record)
    .run_task(&service, &mut session)?;

  Ok(())
}
