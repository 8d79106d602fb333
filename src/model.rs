// 该文件是 Jianwei （见微） 项目的一部分。
// src/model.rs - 模型网关
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

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cache;
mod replay;

pub use self::cache::ModelCache;
pub use self::replay::{ReplayLoader, ReplayModel, ReplayModelError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
  #[error("置信度阈值必须在 [0, 1] 之间，实际为 {0}")]
  Confidence(f32),
  #[error("IoU 阈值必须在 [0, 1] 之间，实际为 {0}")]
  Iou(f32),
}

pub(crate) fn in_unit_interval(value: f32) -> bool {
  (0.0..=1.0).contains(&value)
}

/// 推理阈值，由外部模型负责应用
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
  confidence: f32,
  iou: f32,
}

impl Default for Thresholds {
  fn default() -> Self {
    Self {
      confidence: Self::DEFAULT_CONFIDENCE,
      iou: Self::DEFAULT_IOU,
    }
  }
}

impl Thresholds {
  pub const DEFAULT_CONFIDENCE: f32 = 0.25;
  pub const DEFAULT_IOU: f32 = 0.45;

  pub fn new(confidence: f32, iou: f32) -> Result<Self, ThresholdError> {
    if !in_unit_interval(confidence) {
      return Err(ThresholdError::Confidence(confidence));
    }
    if !in_unit_interval(iou) {
      return Err(ThresholdError::Iou(iou));
    }
    Ok(Self { confidence, iou })
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn iou(&self) -> f32 {
    self.iou
  }
}

/// 单张图像的模型原始输出，三个数组按下标一一对应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPredictions {
  pub boxes: Vec<[f32; 4]>, // [x_min, y_min, x_max, y_max]
  pub scores: Vec<f32>,
  pub class_ids: Vec<i64>,
}

impl RawPredictions {
  /// 检测数以边框数为准；三组数组是否等长由 `is_aligned` 判断
  pub fn len(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_aligned(&self) -> bool {
    self.boxes.len() == self.scores.len() && self.boxes.len() == self.class_ids.len()
  }
}

pub trait Model {
  type Error;

  /// `Ok(None)` 表示模型没有产生结果容器，不等同于零个检测
  fn infer(
    &self,
    image: &RgbImage,
    thresholds: &Thresholds,
  ) -> Result<Option<RawPredictions>, Self::Error>;
}

pub trait ModelLoader {
  type Model: Model;
  type Error;

  fn load(&self, variant: ModelVariant) -> Result<Self::Model, Self::Error>;
}

/// 可选的模型规模
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
  #[default]
  Nano,
  Small,
  Medium,
  Large,
  #[value(name = "xlarge")]
  XLarge,
}

/// 模型元信息，仅用于展示
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelInfo {
  pub name: &'static str,
  pub parameters: &'static str,
  pub size: &'static str,
  pub map50: f32,
  pub map50_95: f32,
  pub speed_gpu_ms: f32,
  pub speed_cpu_ms: f32,
  pub description: &'static str,
}

const NANO_INFO: ModelInfo = ModelInfo {
  name: "YOLOv8 Nano",
  parameters: "3.2M",
  size: "6.3MB",
  map50: 0.637,
  map50_95: 0.454,
  speed_gpu_ms: 8.7,
  speed_cpu_ms: 23.4,
  description: "轻量高速，适合边缘设备",
};

const SMALL_INFO: ModelInfo = ModelInfo {
  name: "YOLOv8 Small",
  parameters: "11.2M",
  size: "22.6MB",
  map50: 0.718,
  map50_95: 0.554,
  speed_gpu_ms: 12.9,
  speed_cpu_ms: 35.2,
  description: "均衡型，适合一般用途",
};

const MEDIUM_INFO: ModelInfo = ModelInfo {
  name: "YOLOv8 Medium",
  parameters: "25.9M",
  size: "52.2MB",
  map50: 0.764,
  map50_95: 0.628,
  speed_gpu_ms: 22.6,
  speed_cpu_ms: 61.8,
  description: "高精度，适合服务器部署",
};

const LARGE_INFO: ModelInfo = ModelInfo {
  name: "YOLOv8 Large",
  parameters: "43.7M",
  size: "87.7MB",
  map50: 0.792,
  map50_95: 0.671,
  speed_gpu_ms: 31.2,
  speed_cpu_ms: 85.4,
  description: "更高精度，适合研究用途",
};

const XLARGE_INFO: ModelInfo = ModelInfo {
  name: "YOLOv8 XLarge",
  parameters: "68.2M",
  size: "136.6MB",
  map50: 0.814,
  map50_95: 0.699,
  speed_gpu_ms: 35.7,
  speed_cpu_ms: 98.1,
  description: "最高精度，适合特殊用途",
};

impl ModelVariant {
  pub const ALL: [ModelVariant; 5] = [
    ModelVariant::Nano,
    ModelVariant::Small,
    ModelVariant::Medium,
    ModelVariant::Large,
    ModelVariant::XLarge,
  ];

  /// 不带扩展名的模型文件名，例如 `yolov8n`
  pub fn file_stem(&self) -> &'static str {
    match self {
      ModelVariant::Nano => "yolov8n",
      ModelVariant::Small => "yolov8s",
      ModelVariant::Medium => "yolov8m",
      ModelVariant::Large => "yolov8l",
      ModelVariant::XLarge => "yolov8x",
    }
  }

  pub fn info(&self) -> &'static ModelInfo {
    match self {
      ModelVariant::Nano => &NANO_INFO,
      ModelVariant::Small => &SMALL_INFO,
      ModelVariant::Medium => &MEDIUM_INFO,
      ModelVariant::Large => &LARGE_INFO,
      ModelVariant::XLarge => &XLARGE_INFO,
    }
  }
}

impl std::fmt::Display for ModelVariant {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}.pt", self.file_stem())
  }
}
