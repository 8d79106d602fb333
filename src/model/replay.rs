// 该文件是 Jianwei （见微） 项目的一部分。
// src/model/replay.rs - 回放模型
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Model, ModelLoader, ModelVariant, RawPredictions, Thresholds},
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型文件格式错误: {0}")]
  ModelFormatError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("输入图像为空: {0}x{1}")]
  EmptyImage(u32, u32),
}

/// 从目录中按模型规模加载记录好的原始输出
///
/// 目录下的文件以模型规模命名，例如 `yolov8n.json`。文件内容为
/// `{"boxes": [[x1, y1, x2, y2], ...], "scores": [...], "class_ids": [...]}`，
/// 或者 `null`，表示模型没有产生结果。
#[derive(Debug, Clone)]
pub struct ReplayLoader {
  dir: PathBuf,
}

impl FromUrlWithScheme for ReplayLoader {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayLoader {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ReplayModelError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let dir = crate::url_path(url);
    let dir = if dir.as_os_str().is_empty() {
      PathBuf::from(".")
    } else {
      dir
    };
    Ok(Self::new(dir))
  }
}

impl ReplayLoader {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn model_path(&self, variant: ModelVariant) -> PathBuf {
    self.dir.join(format!("{}.json", variant.file_stem()))
  }
}

impl ModelLoader for ReplayLoader {
  type Model = ReplayModel;
  type Error = ReplayModelError;

  fn load(&self, variant: ModelVariant) -> Result<Self::Model, Self::Error> {
    let path = self.model_path(variant);
    info!("加载模型文件: {}", path.display());
    let data = std::fs::read(&path)?;
    debug!("模型文件大小: {:.2} KB", data.len() as f64 / 1024.0);

    let predictions: Option<RawPredictions> = serde_json::from_slice(&data)?;
    info!("模型加载完成");

    Ok(ReplayModel::new(variant, predictions))
  }
}

#[derive(Debug)]
pub struct ReplayModel {
  variant: ModelVariant,
  predictions: Option<RawPredictions>,
}

impl ReplayModel {
  pub fn new(variant: ModelVariant, predictions: Option<RawPredictions>) -> Self {
    Self {
      variant,
      predictions,
    }
  }

  pub fn variant(&self) -> ModelVariant {
    self.variant
  }
}

impl Model for ReplayModel {
  type Error = ReplayModelError;

  fn infer(
    &self,
    image: &RgbImage,
    thresholds: &Thresholds,
  ) -> Result<Option<RawPredictions>, Self::Error> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(ReplayModelError::EmptyImage(width, height));
    }

    debug!("执行模型推理: {} ({}x{})", self.variant, width, height);
    let Some(raw) = &self.predictions else {
      debug!("模型没有输出结果");
      return Ok(None);
    };

    if !raw.is_aligned() {
      warn!(
        "原始输出长度不一致: 边框 {}, 置信度 {}, 类别 {}",
        raw.boxes.len(),
        raw.scores.len(),
        raw.class_ids.len()
      );
      return Ok(Some(raw.clone()));
    }

    Ok(Some(suppress(raw, thresholds)))
  }
}

/// 置信度过滤后按类别做非极大值抑制，输出按置信度降序排列
fn suppress(raw: &RawPredictions, thresholds: &Thresholds) -> RawPredictions {
  // NaN 分数保留下来交给结果校验
  let mut candidates: Vec<usize> = (0..raw.len())
    .filter(|&i| raw.scores[i].is_nan() || raw.scores[i] >= thresholds.confidence())
    .collect();
  candidates.sort_by(|&a, &b| raw.scores[b].total_cmp(&raw.scores[a]));

  let mut kept = Vec::new();
  while !candidates.is_empty() {
    let best = candidates.remove(0);
    kept.push(best);

    candidates.retain(|&other| {
      if raw.class_ids[other] != raw.class_ids[best] {
        return true;
      }
      iou(&raw.boxes[best], &raw.boxes[other]) < thresholds.iou()
    });
  }

  debug!("阈值过滤: {} -> {}", raw.len(), kept.len());

  RawPredictions {
    boxes: kept.iter().map(|&i| raw.boxes[i]).collect(),
    scores: kept.iter().map(|&i| raw.scores[i]).collect(),
    class_ids: kept.iter().map(|&i| raw.class_ids[i]).collect(),
  }
}

/// 计算两个边界框的 IoU
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}
