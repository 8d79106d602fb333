// 该文件是 Jianwei （见微） 项目的一部分。
// src/task.rs - 任务驱动
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

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::{
  input::ImageSource,
  model::{Model, ModelLoader},
  output::{
    Render, SaveImageFileOutput,
    record::{DetectionRecord, RecordOutput},
    report::{ConfidenceHistogram, DetectionDetails, StatisticsReport},
  },
  session::{DetectionOutcome, DetectionService, Session},
  stats::DetectionStatistics,
};

pub trait Task<L: ModelLoader>: Sized {
  type Error;
  fn run_task(self, service: &DetectionService<L>, session: &mut Session)
  -> Result<(), Self::Error>;
}

/// 读取一张图像、检测一次并输出结果
pub struct OneShotTask {
  source: ImageSource,
  output: Option<SaveImageFileOutput>,
  record: Option<RecordOutput>,
}

impl OneShotTask {
  pub fn new(source: ImageSource) -> Self {
    Self {
      source,
      output: None,
      record: None,
    }
  }

  pub fn with_output(mut self, output: Option<SaveImageFileOutput>) -> Self {
    self.output = output;
    self
  }

  pub fn with_record(mut self, record: Option<RecordOutput>) -> Self {
    self.record = record;
    self
  }
}

impl<L> Task<L> for OneShotTask
where
  L: ModelLoader,
  L::Error: std::error::Error + Send + Sync + 'static,
  <L::Model as Model>::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, service: &DetectionService<L>, session: &mut Session) -> Result<(), Self::Error> {
    info!("开始任务...");
    service.load_image(session, &self.source)?;
    info!("输入图像获取成功，开始推理...");

    let now = Instant::now();
    let outcome = service.detect(session)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    let (Some(loaded), Some(result)) = (session.image(), session.result()) else {
      warn!("没有可显示的检测结果");
      return Ok(());
    };
    if outcome == DetectionOutcome::NoResult {
      warn!("模型未返回结果，显示上一次检测结果");
    }

    let settings = session.settings();
    let statistics = DetectionStatistics::from_result(result);
    print!("{}", StatisticsReport::new(&statistics, result.inference_time_ms()));
    if settings.debug {
      print!("{}", DetectionDetails(result));
      print!("{}", ConfidenceHistogram::new(result));
    }

    if let Some(output) = &self.output {
      output.render_result(&loaded.image, result)?;
      info!("渲染完成: {}", output.path().display());
    }

    if let Some(record) = &self.record {
      let image_size = [loaded.image.width(), loaded.image.height()];
      record.write(&DetectionRecord::new(
        settings.model,
        &loaded.source,
        image_size,
        settings.thresholds,
        result,
      ))?;
    }

    Ok(())
  }
}

/// 对同一张图像重复推理，统计平均耗时
pub struct RepeatShotTask {
  source: ImageSource,
  repeat: usize,
}

impl RepeatShotTask {
  const WARMUP: usize = 2;

  pub fn new(source: ImageSource, repeat: usize) -> Self {
    Self { source, repeat }
  }

  /// 次数大于预热次数时排除预热轮
  pub fn mean_time(times: &[Duration]) -> Option<Duration> {
    let measured = if times.len() > Self::WARMUP {
      &times[Self::WARMUP..]
    } else {
      times
    };
    let count = u32::try_from(measured.len()).ok().filter(|n| *n > 0)?;
    Some(measured.iter().sum::<Duration>() / count)
  }
}

impl<L> Task<L> for RepeatShotTask
where
  L: ModelLoader,
  L::Error: std::error::Error + Send + Sync + 'static,
  <L::Model as Model>::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, service: &DetectionService<L>, session: &mut Session) -> Result<(), Self::Error> {
    info!("开始任务...");
    service.load_image(session, &self.source)?;
    info!("输入图像获取成功，开始推理...");

    let mut times = Vec::with_capacity(self.repeat);
    for i in 0..self.repeat {
      let now = Instant::now();
      let outcome = service.detect(session)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}，结果: {:?}", i, elapsed, outcome);
      times.push(elapsed);
    }

    match Self::mean_time(&times) {
      Some(mean) => warn!("平均推理时间: {:.2?}", mean),
      None => warn!("未执行推理"),
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mean_time_skips_warmup_runs() {
    let times = [
      Duration::from_millis(100),
      Duration::from_millis(50),
      Duration::from_millis(10),
      Duration::from_millis(20),
    ];
    assert_eq!(
      RepeatShotTask::mean_time(&times),
      Some(Duration::from_millis(15))
    );
  }

  #[test]
  fn mean_time_keeps_short_runs() {
    let times = [Duration::from_millis(10), Duration::from_millis(30)];
    assert_eq!(
      RepeatShotTask::mean_time(&times),
      Some(Duration::from_millis(20))
    );
    assert_eq!(RepeatShotTask::mean_time(&[]), None);
  }
}
