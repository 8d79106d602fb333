// 该文件是 Jianwei （见微） 项目的一部分。
// src/stats.rs - 检测统计
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

use std::collections::HashMap;

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::detection::DetectionResult;

/// 置信度分布直方图的默认分箱数
pub const HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceSummary {
  pub mean: f32,
  pub max: f32,
  pub min: f32,
}

/// 由检测结果即时计算的统计信息
///
/// 没有检测目标时 `confidence` 为 `None`，表示“不适用”。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionStatistics {
  pub count: usize,
  pub confidence: Option<ConfidenceSummary>,
  #[serde(serialize_with = "serialize_ranked")]
  pub per_class_counts: HashMap<String, usize>,
}

impl DetectionStatistics {
  pub fn from_result(result: &DetectionResult) -> Self {
    let mut per_class_counts: HashMap<String, usize> = HashMap::new();
    let mut sum = 0.0f64;
    let mut max = f32::MIN;
    let mut min = f32::MAX;

    for item in result.items() {
      *per_class_counts
        .entry(item.class_name().to_string())
        .or_default() += 1;
      sum += f64::from(item.confidence());
      max = max.max(item.confidence());
      min = min.min(item.confidence());
    }

    let count = result.len();
    let confidence = (count > 0).then(|| ConfidenceSummary {
      mean: (sum / count as f64) as f32,
      max,
      min,
    });

    Self {
      count,
      confidence,
      per_class_counts,
    }
  }

  pub fn mean_confidence(&self) -> Option<f32> {
    self.confidence.map(|c| c.mean)
  }

  pub fn max_confidence(&self) -> Option<f32> {
    self.confidence.map(|c| c.max)
  }

  pub fn min_confidence(&self) -> Option<f32> {
    self.confidence.map(|c| c.min)
  }

  pub fn unique_classes(&self) -> usize {
    self.per_class_counts.len()
  }

  /// 按检测数降序、类别名升序排列的类别计数
  pub fn ranked_class_counts(&self) -> Vec<(&str, usize)> {
    let mut ranked: Vec<(&str, usize)> = self
      .per_class_counts
      .iter()
      .map(|(name, &count)| (name.as_str(), count))
      .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
  }
}

fn serialize_ranked<S: Serializer>(
  counts: &HashMap<String, usize>,
  serializer: S,
) -> Result<S::Ok, S::Error> {
  let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
  ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

  let mut map = serializer.serialize_map(Some(ranked.len()))?;
  for (name, count) in ranked {
    map.serialize_entry(name, count)?;
  }
  map.end()
}

/// 将置信度按 [0, 1] 均匀分箱计数，1.0 落入最后一个箱
pub fn confidence_histogram(result: &DetectionResult, bins: usize) -> Vec<usize> {
  let mut histogram = vec![0usize; bins];
  if bins == 0 {
    return histogram;
  }

  for item in result.items() {
    let index = ((item.confidence() * bins as f32) as usize).min(bins - 1);
    histogram[index] += 1;
  }
  histogram
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    detection::normalize,
    labels::ClassTable,
    model::RawPredictions,
  };

  fn result(scores: &[f32], class_ids: &[i64]) -> DetectionResult {
    let raw = RawPredictions {
      boxes: vec![[10.0, 10.0, 50.0, 50.0]; scores.len()],
      scores: scores.to_vec(),
      class_ids: class_ids.to_vec(),
    };
    normalize(Some(&raw), &ClassTable::coco(), None)
      .unwrap()
      .into_result()
      .unwrap()
  }

  fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
  }

  #[test]
  fn empty_result_has_no_confidence_summary() {
    let stats = DetectionStatistics::from_result(&result(&[], &[]));
    assert_eq!(stats.count, 0);
    assert_eq!(stats.confidence, None);
    assert_eq!(stats.mean_confidence(), None);
    assert_eq!(stats.max_confidence(), None);
    assert_eq!(stats.min_confidence(), None);
    assert!(stats.per_class_counts.is_empty());
    assert!(stats.ranked_class_counts().is_empty());
  }

  #[test]
  fn single_detection_summary() {
    let stats = DetectionStatistics::from_result(&result(&[0.9], &[0]));
    assert_eq!(stats.count, 1);
    assert!(close(stats.mean_confidence().unwrap(), 0.9));
    assert!(close(stats.max_confidence().unwrap(), 0.9));
    assert!(close(stats.min_confidence().unwrap(), 0.9));
    assert_eq!(stats.per_class_counts.get("person"), Some(&1));
    assert_eq!(stats.unique_classes(), 1);
  }

  #[test]
  fn two_cars_summary() {
    let stats = DetectionStatistics::from_result(&result(&[0.4, 0.8], &[2, 2]));
    assert_eq!(stats.count, 2);
    assert!(close(stats.mean_confidence().unwrap(), 0.6));
    assert!(close(stats.max_confidence().unwrap(), 0.8));
    assert!(close(stats.min_confidence().unwrap(), 0.4));
    assert_eq!(stats.per_class_counts.len(), 1);
    assert_eq!(stats.per_class_counts.get("car"), Some(&2));
  }

  #[test]
  fn class_counts_sum_to_count() {
    let stats = DetectionStatistics::from_result(&result(
      &[0.3, 0.5, 0.7, 0.9, 0.2],
      &[0, 2, 0, 16, 2],
    ));
    assert_eq!(stats.per_class_counts.values().sum::<usize>(), stats.count);
  }

  #[test]
  fn ranking_is_count_descending_then_name_ascending() {
    let stats = DetectionStatistics::from_result(&result(
      &[0.5; 6],
      &[16, 2, 0, 2, 15, 0],
    ));
    assert_eq!(
      stats.ranked_class_counts(),
      vec![("car", 2), ("person", 2), ("cat", 1), ("dog", 1)]
    );
  }

  #[test]
  fn grouping_key_is_the_class_name() {
    let table = ClassTable::new(["vehicle", "vehicle"]).unwrap();
    let raw = RawPredictions {
      boxes: vec![[0.0, 0.0, 1.0, 1.0]; 2],
      scores: vec![0.5, 0.6],
      class_ids: vec![0, 1],
    };
    let result = normalize(Some(&raw), &table, None)
      .unwrap()
      .into_result()
      .unwrap();
    let stats = DetectionStatistics::from_result(&result);
    assert_eq!(stats.ranked_class_counts(), vec![("vehicle", 2)]);
  }

  #[test]
  fn histogram_places_edges_in_range() {
    let histogram = confidence_histogram(&result(&[0.0, 0.049, 0.5, 1.0], &[0, 0, 0, 0]), 20);
    assert_eq!(histogram.len(), 20);
    assert_eq!(histogram[0], 2);
    assert_eq!(histogram[10], 1);
    assert_eq!(histogram[19], 1);
    assert_eq!(histogram.iter().sum::<usize>(), 4);
    assert!(confidence_histogram(&result(&[0.5], &[0]), 0).is_empty());
  }

  #[test]
  fn serialized_counts_follow_ranking() {
    let stats = DetectionStatistics::from_result(&result(&[0.5; 3], &[16, 2, 2]));
    let json = serde_json::to_string(&stats).unwrap();
    let car = json.find("\"car\"").unwrap();
    let dog = json.find("\"dog\"").unwrap();
    assert!(car < dog);
  }
}
