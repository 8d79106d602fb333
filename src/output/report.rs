// 该文件是 Jianwei （见微） 项目的一部分。
// src/output/report.rs - 文本报告
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

use std::fmt;

use crate::{
  detection::DetectionResult,
  model::ModelVariant,
  stats::{DetectionStatistics, HISTOGRAM_BINS, confidence_histogram},
};

const HISTOGRAM_BAR_WIDTH: usize = 40;

/// 统计摘要；无检测目标时置信度显示为 N/A
pub struct StatisticsReport<'a> {
  statistics: &'a DetectionStatistics,
  inference_time_ms: Option<f64>,
}

impl<'a> StatisticsReport<'a> {
  pub fn new(statistics: &'a DetectionStatistics, inference_time_ms: Option<f64>) -> Self {
    Self {
      statistics,
      inference_time_ms,
    }
  }
}

fn fmt_confidence(value: Option<f32>) -> String {
  value.map_or_else(|| "N/A".to_string(), |v| format!("{:.3}", v))
}

impl fmt::Display for StatisticsReport<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let stats = self.statistics;
    writeln!(f, "检测目标数: {}", stats.count)?;
    writeln!(f, "类别数: {}", stats.unique_classes())?;
    writeln!(f, "平均置信度: {}", fmt_confidence(stats.mean_confidence()))?;
    writeln!(f, "最高置信度: {}", fmt_confidence(stats.max_confidence()))?;
    writeln!(f, "最低置信度: {}", fmt_confidence(stats.min_confidence()))?;
    if let Some(ms) = self.inference_time_ms {
      writeln!(f, "推理耗时: {:.1} ms", ms)?;
    }

    let ranked = stats.ranked_class_counts();
    if !ranked.is_empty() {
      writeln!(f, "类别分布:")?;
      for (name, count) in ranked {
        writeln!(f, "- {}: {} 个", name, count)?;
      }
    }
    Ok(())
  }
}

/// 逐项检测详情
pub struct DetectionDetails<'a>(pub &'a DetectionResult);

impl fmt::Display for DetectionDetails<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (index, item) in self.0.items().iter().enumerate() {
      let [x1, y1, x2, y2] = *item.bbox();
      writeln!(
        f,
        "{}. {} (置信度: {:.3}) - 坐标: ({:.1}, {:.1}, {:.1}, {:.1})",
        index + 1,
        item.class_name(),
        item.confidence(),
        x1,
        y1,
        x2,
        y2
      )?;
    }
    Ok(())
  }
}

/// 置信度分布的文本直方图
pub struct ConfidenceHistogram {
  counts: Vec<usize>,
}

impl ConfidenceHistogram {
  pub fn new(result: &DetectionResult) -> Self {
    Self {
      counts: confidence_histogram(result, HISTOGRAM_BINS),
    }
  }

  pub fn counts(&self) -> &[usize] {
    &self.counts
  }
}

impl fmt::Display for ConfidenceHistogram {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let bins = self.counts.len();
    let peak = self.counts.iter().copied().max().unwrap_or(0);
    for (index, &count) in self.counts.iter().enumerate() {
      let low = index as f32 / bins as f32;
      let high = (index + 1) as f32 / bins as f32;
      let bar = if peak == 0 {
        0
      } else {
        (count * HISTOGRAM_BAR_WIDTH).div_ceil(peak)
      };
      writeln!(f, "[{:.2}, {:.2}) {:>3} {}", low, high, count, "#".repeat(bar))?;
    }
    Ok(())
  }
}

/// 可选模型对照表
pub struct ModelInfoTable;

impl fmt::Display for ModelInfoTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "{:<12} {:<15} {:>8} {:>9} {:>7} {:>10} {:>9} {:>9}  说明",
      "模型", "名称", "参数量", "大小", "mAP50", "mAP50-95", "GPU(ms)", "CPU(ms)"
    )?;
    for variant in ModelVariant::ALL {
      let info = variant.info();
      writeln!(
        f,
        "{:<12} {:<15} {:>8} {:>9} {:>7.3} {:>10.3} {:>9.1} {:>9.1}  {}",
        variant.to_string(),
        info.name,
        info.parameters,
        info.size,
        info.map50,
        info.map50_95,
        info.speed_gpu_ms,
        info.speed_cpu_ms,
        info.description
      )?;
    }
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

  fn result(scores: &[f32], class_ids: &[i64]) -> DetectionResult {
    let raw = RawPredictions {
      boxes: vec![[10.0, 20.0, 110.5, 220.3]; scores.len()],
      scores: scores.to_vec(),
      class_ids: class_ids.to_vec(),
    };
    match normalize(Some(&raw), &ClassTable::coco(), None).unwrap() {
      Normalized::Detections(result) => result,
      Normalized::NoResult => unreachable!(),
    }
  }

  #[test]
  fn empty_statistics_show_not_applicable() {
    let stats = DetectionStatistics::from_result(&result(&[], &[]));
    let text = StatisticsReport::new(&stats, None).to_string();
    assert!(text.contains("检测目标数: 0"));
    assert!(text.contains("平均置信度: N/A"));
    assert!(!text.contains("推理耗时"));
    assert!(!text.contains("类别分布"));
  }

  #[test]
  fn statistics_list_classes_by_count() {
    let stats = DetectionStatistics::from_result(&result(&[0.9, 0.8, 0.7], &[0, 2, 2]));
    let text = StatisticsReport::new(&stats, Some(12.34)).to_string();
    assert!(text.contains("平均置信度: 0.800"));
    assert!(text.contains("推理耗时: 12.3 ms"));

    let car = text.find("- car: 2 个").unwrap();
    let person = text.find("- person: 1 个").unwrap();
    assert!(car < person);
  }

  #[test]
  fn details_are_numbered_in_model_order() {
    let text = DetectionDetails(&result(&[0.8, 0.9], &[2, 0])).to_string();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
      lines,
      [
        "1. car (置信度: 0.800) - 坐标: (10.0, 20.0, 110.5, 220.3)",
        "2. person (置信度: 0.900) - 坐标: (10.0, 20.0, 110.5, 220.3)",
      ]
    );
  }

  #[test]
  fn histogram_has_one_line_per_bin() {
    let histogram = ConfidenceHistogram::new(&result(&[0.91, 0.93, 0.5], &[0, 0, 0]));
    assert_eq!(histogram.counts().iter().sum::<usize>(), 3);
    let text = histogram.to_string();
    assert_eq!(text.lines().count(), HISTOGRAM_BINS);
    assert!(text.lines().nth(18).unwrap().ends_with(&"#".repeat(HISTOGRAM_BAR_WIDTH)));
  }

  #[test]
  fn model_table_lists_every_variant() {
    let text = ModelInfoTable.to_string();
    assert_eq!(text.lines().count(), ModelVariant::ALL.len() + 1);
    assert!(text.contains("yolov8n.pt"));
    assert!(text.contains("YOLOv8 XLarge"));
  }
}
