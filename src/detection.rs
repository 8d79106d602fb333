// 该文件是 Jianwei （见微） 项目的一部分。
// src/detection.rs - 检测结果与结果规范化
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

use serde::Serialize;
use thiserror::Error;

use crate::{
  labels::ClassTable,
  model::{RawPredictions, in_unit_interval},
};

/// 单个检测目标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionItem {
  bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
  confidence: f32,
  class_id: u32,
  class_name: String,
}

impl DetectionItem {
  pub fn bbox(&self) -> &[f32; 4] {
    &self.bbox
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn class_id(&self) -> u32 {
    self.class_id
  }

  pub fn class_name(&self) -> &str {
    &self.class_name
  }

  pub fn width(&self) -> f32 {
    self.bbox[2] - self.bbox[0]
  }

  pub fn height(&self) -> f32 {
    self.bbox[3] - self.bbox[1]
  }
}

/// 一次推理的规范化结果，创建后不可修改
///
/// `items` 保持模型输出顺序；空结果是合法的。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionResult {
  items: Box<[DetectionItem]>,
  #[serde(skip_serializing_if = "Option::is_none")]
  inference_time_ms: Option<f64>,
}

impl DetectionResult {
  pub fn items(&self) -> &[DetectionItem] {
    &self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn inference_time_ms(&self) -> Option<f64> {
    self.inference_time_ms
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
  Detections(DetectionResult),
  /// 模型没有产生结果容器
  NoResult,
}

impl Normalized {
  pub fn into_result(self) -> Option<DetectionResult> {
    match self {
      Normalized::Detections(result) => Some(result),
      Normalized::NoResult => None,
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
  #[error("原始输出长度不一致: 边框 {boxes}, 置信度 {scores}, 类别 {class_ids}")]
  LengthMismatch {
    boxes: usize,
    scores: usize,
    class_ids: usize,
  },
  #[error("第 {index} 个检测框坐标不是有限数: {bbox:?}")]
  NonFiniteBox { index: usize, bbox: [f32; 4] },
  #[error("第 {index} 个检测框坐标顺序错误: {bbox:?}")]
  InvertedBox { index: usize, bbox: [f32; 4] },
  #[error("第 {index} 个检测置信度超出 [0, 1]: {confidence}")]
  ConfidenceOutOfRange { index: usize, confidence: f32 },
  #[error("第 {index} 个检测类别索引无效: {class_id}（类别表大小 {table_len}）")]
  UnknownClass {
    index: usize,
    class_id: i64,
    table_len: usize,
  },
}

/// 将模型原始输出转换为规范化的检测结果
///
/// `raw` 为 `None` 时返回 [`Normalized::NoResult`]；零个检测返回空结果。
/// 任何一项不满足约束时整体拒绝，不做截断或修正。
pub fn normalize(
  raw: Option<&RawPredictions>,
  class_table: &ClassTable,
  inference_time_ms: Option<f64>,
) -> Result<Normalized, NormalizeError> {
  let Some(raw) = raw else {
    return Ok(Normalized::NoResult);
  };

  if !raw.is_aligned() {
    return Err(NormalizeError::LengthMismatch {
      boxes: raw.boxes.len(),
      scores: raw.scores.len(),
      class_ids: raw.class_ids.len(),
    });
  }

  let items = raw
    .boxes
    .iter()
    .zip(&raw.scores)
    .zip(&raw.class_ids)
    .enumerate()
    .map(|(index, ((bbox, &confidence), &class_id))| {
      normalize_item(index, bbox, confidence, class_id, class_table)
    })
    .collect::<Result<Box<[_]>, _>>()?;

  Ok(Normalized::Detections(DetectionResult {
    items,
    inference_time_ms: inference_time_ms.filter(|ms| ms.is_finite() && *ms >= 0.0),
  }))
}

fn normalize_item(
  index: usize,
  bbox: &[f32; 4],
  confidence: f32,
  class_id: i64,
  class_table: &ClassTable,
) -> Result<DetectionItem, NormalizeError> {
  let bbox = *bbox;
  if bbox.iter().any(|v| !v.is_finite()) {
    return Err(NormalizeError::NonFiniteBox { index, bbox });
  }
  if bbox[0] > bbox[2] || bbox[1] > bbox[3] {
    return Err(NormalizeError::InvertedBox { index, bbox });
  }
  if !in_unit_interval(confidence) {
    return Err(NormalizeError::ConfidenceOutOfRange { index, confidence });
  }

  let unknown = || NormalizeError::UnknownClass {
    index,
    class_id,
    table_len: class_table.len(),
  };
  let class_id = u32::try_from(class_id).map_err(|_| unknown())?;
  let class_name = class_table.get(class_id).ok_or_else(unknown)?;

  Ok(DetectionItem {
    bbox,
    confidence,
    class_id,
    class_name: class_name.to_string(),
  })
}
