// 该文件是 Jianwei （见微） 项目的一部分。
// src/output/record.rs - 检测记录
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

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{
  detection::DetectionResult,
  model::{ModelVariant, Thresholds},
  stats::{DetectionStatistics, HISTOGRAM_BINS, confidence_histogram},
};

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 一次检测的完整记录
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRecord<'a> {
  pub created_at: DateTime<Utc>,
  pub model: ModelVariant,
  pub source: &'a str,
  pub image_size: [u32; 2],
  pub thresholds: Thresholds,
  pub result: &'a DetectionResult,
  pub statistics: DetectionStatistics,
  pub histogram: Vec<usize>,
}

impl<'a> DetectionRecord<'a> {
  pub fn new(
    model: ModelVariant,
    source: &'a str,
    image_size: [u32; 2],
    thresholds: Thresholds,
    result: &'a DetectionResult,
  ) -> Self {
    Self {
      created_at: Utc::now(),
      model,
      source,
      image_size,
      thresholds,
      result,
      statistics: DetectionStatistics::from_result(result),
      histogram: confidence_histogram(result, HISTOGRAM_BINS),
    }
  }
}

#[derive(Debug, Clone)]
pub struct RecordOutput {
  path: PathBuf,
}

impl RecordOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn write(&self, record: &DetectionRecord<'_>) -> Result<(), RecordError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&self.path, json)?;
    info!("保存检测记录: {}", self.path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    detection::{Normalized, normalize},
    labels::ClassTable,
    model::RawPredictions,
  };

  #[test]
  fn record_serializes_result_and_statistics() {
    let raw = RawPredictions {
      boxes: vec![[10.0, 20.0, 50.0, 80.0], [5.0, 5.0, 15.0, 15.0]],
      scores: vec![0.8, 0.6],
      class_ids: vec![2, 0],
    };
    let Normalized::Detections(result) =
      normalize(Some(&raw), &ClassTable::coco(), Some(12.5)).unwrap()
    else {
      panic!("expected detections");
    };

    let dir = tempfile::tempdir().unwrap();
    let output = RecordOutput::new(dir.path().join("records/street.json"));
    let record = DetectionRecord::new(
      ModelVariant::Small,
      "sample://street",
      [640, 480],
      Thresholds::default(),
      &result,
    );
    output.write(&record).unwrap();

    let text = std::fs::read_to_string(output.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["model"], "small");
    assert_eq!(value["source"], "sample://street");
    assert_eq!(value["image_size"], serde_json::json!([640, 480]));
    assert_eq!(value["result"]["items"][0]["class_name"], "car");
    assert_eq!(value["result"]["inference_time_ms"], 12.5);
    assert_eq!(value["statistics"]["count"], 2);
    assert_eq!(value["statistics"]["per_class_counts"]["person"], 1);
    assert_eq!(value["histogram"].as_array().unwrap().len(), HISTOGRAM_BINS);
    assert!(value["created_at"].is_string());
  }
}
