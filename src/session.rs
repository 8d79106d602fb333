// 该文件是 Jianwei （见微） 项目的一部分。
// src/session.rs - 检测会话
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

use std::{path::PathBuf, sync::Arc, time::Instant};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  detection::{DetectionResult, NormalizeError, Normalized, normalize},
  input::{FetchOptions, ImageSource, InputError},
  labels::ClassTable,
  model::{Model, ModelCache, ModelLoader, ModelVariant, Thresholds},
  output::{
    draw::{Draw, DrawOptions},
    font::{FontError, LabelFont},
  },
  stats::DetectionStatistics,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 用户可调整的设置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
  pub model: ModelVariant,
  pub thresholds: Thresholds,
  pub draw: DrawOptions,
  pub debug: bool,
  pub fetch: FetchOptions,
  pub font: Option<PathBuf>,
}

impl Settings {
  /// 按当前显示开关和字体设置构造绘制器
  pub fn renderer(&self) -> Result<Draw, FontError> {
    Ok(Draw::new(LabelFont::discover(self.font.as_deref())?, self.draw))
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
  pub source: String,
  pub image: RgbImage,
}

/// 单个交互会话的状态：当前图像与其检测结果
#[derive(Debug, Clone, Default)]
pub struct Session {
  settings: Settings,
  image: Option<LoadedImage>,
  result: Option<DetectionResult>,
}

impl Session {
  pub fn new(settings: Settings) -> Self {
    Self {
      settings,
      image: None,
      result: None,
    }
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn settings_mut(&mut self) -> &mut Settings {
    &mut self.settings
  }

  pub fn image(&self) -> Option<&LoadedImage> {
    self.image.as_ref()
  }

  pub fn result(&self) -> Option<&DetectionResult> {
    self.result.as_ref()
  }

  /// 统计信息不缓存，每次由当前结果计算
  pub fn statistics(&self) -> Option<DetectionStatistics> {
    self.result.as_ref().map(DetectionStatistics::from_result)
  }

  pub fn annotate(&self, draw: &Draw) -> Option<RgbImage> {
    match (&self.image, &self.result) {
      (Some(loaded), Some(result)) => Some(draw.annotate(&loaded.image, result)),
      _ => None,
    }
  }

  // 结果属于计算它的图像，换图后清空
  fn replace_image(&mut self, image: LoadedImage) {
    self.image = Some(image);
    self.result = None;
  }

  fn replace_result(&mut self, result: DetectionResult) {
    self.result = Some(result);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
  Detected(usize),
  NoResult,
}

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("尚未加载图像")]
  NoImage,
  #[error("模型 {variant} 加载失败: {source}")]
  ModelLoad {
    variant: ModelVariant,
    #[source]
    source: BoxError,
  },
  #[error("推理失败: {0}")]
  Inference(#[source] BoxError),
  #[error("结果规范化失败: {0}")]
  Normalize(#[from] NormalizeError),
}

/// 模型加载、推理与结果规范化
///
/// 模型按规模缓存，进程内每种规模只加载一次。任何失败都不会改变会话中已有的结果。
pub struct DetectionService<L: ModelLoader> {
  loader: L,
  cache: ModelCache<L::Model>,
  class_table: ClassTable,
}

impl<L> DetectionService<L>
where
  L: ModelLoader,
  L::Error: std::error::Error + Send + Sync + 'static,
  <L::Model as Model>::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(loader: L, class_table: ClassTable) -> Self {
    Self {
      loader,
      cache: ModelCache::new(),
      class_table,
    }
  }

  pub fn class_table(&self) -> &ClassTable {
    &self.class_table
  }

  pub fn cache(&self) -> &ModelCache<L::Model> {
    &self.cache
  }

  pub fn model(&self, variant: ModelVariant) -> Result<Arc<L::Model>, DetectError> {
    self
      .cache
      .get_or_load(variant, |variant| {
        info!("加载模型: {}", variant);
        self.loader.load(variant)
      })
      .map_err(|e| DetectError::ModelLoad {
        variant,
        source: Box::new(e),
      })
  }

  pub fn load_image(&self, session: &mut Session, source: &ImageSource) -> Result<(), InputError> {
    let image = source.load(&session.settings.fetch).inspect_err(|e| {
      warn!("读取图像失败 {}: {}", source, e);
    })?;

    info!("已加载图像 {}: {}x{}", source, image.width(), image.height());
    session.replace_image(LoadedImage {
      source: source.to_string(),
      image,
    });
    Ok(())
  }

  pub fn detect(&self, session: &mut Session) -> Result<DetectionOutcome, DetectError> {
    let settings = &session.settings;
    let loaded = session.image.as_ref().ok_or(DetectError::NoImage)?;
    let model = self.model(settings.model)?;

    let started = settings.debug.then(Instant::now);
    let raw = model
      .infer(&loaded.image, &settings.thresholds)
      .map_err(|e| DetectError::Inference(Box::new(e)))
      .inspect_err(|e| warn!("{}", e))?;
    let elapsed = started.map(|start| start.elapsed().as_secs_f64() * 1000.0);

    let normalized = normalize(raw.as_ref(), &self.class_table, elapsed)
      .inspect_err(|e| warn!("模型输出无效: {}", e))?;

    match normalized {
      Normalized::Detections(result) => {
        if let Some(ms) = result.inference_time_ms() {
          debug!("推理耗时 {:.2} ms", ms);
        }
        for item in result.items() {
          debug!(
            "检测到 {} 置信度 {:.3} 坐标 {:?}",
            item.class_name(),
            item.confidence(),
            item.bbox()
          );
        }
        let count = result.len();
        session.replace_result(result);
        Ok(DetectionOutcome::Detected(count))
      }
      Normalized::NoResult => {
        warn!("模型未返回检测结果，保留上一次结果");
        Ok(DetectionOutcome::NoResult)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::RawPredictions;
  use std::cell::{Cell, RefCell};

  #[derive(Error, Debug)]
  enum StubError {
    #[error("模型文件不存在")]
    Missing,
    #[error("推理崩溃")]
    Crashed,
  }

  type Scripted = Result<Option<RawPredictions>, ()>;

  struct StubModel {
    outputs: RefCell<Vec<Scripted>>,
  }

  impl Model for StubModel {
    type Error = StubError;

    fn infer(
      &self,
      _image: &RgbImage,
      _thresholds: &Thresholds,
    ) -> Result<Option<RawPredictions>, Self::Error> {
      let next = self.outputs.borrow_mut().remove(0);
      next.map_err(|_| StubError::Crashed)
    }
  }

  struct StubLoader {
    loads: Cell<usize>,
    script: Vec<Scripted>,
    available: bool,
  }

  impl StubLoader {
    fn new(script: Vec<Scripted>) -> Self {
      Self {
        loads: Cell::new(0),
        script,
        available: true,
      }
    }
  }

  impl ModelLoader for StubLoader {
    type Model = StubModel;
    type Error = StubError;

    fn load(&self, _variant: ModelVariant) -> Result<StubModel, StubError> {
      if !self.available {
        return Err(StubError::Missing);
      }
      self.loads.set(self.loads.get() + 1);
      Ok(StubModel {
        outputs: RefCell::new(self.script.clone()),
      })
    }
  }

  fn cars(n: usize) -> Option<RawPredictions> {
    Some(RawPredictions {
      boxes: vec![[1.0, 1.0, 5.0, 5.0]; n],
      scores: vec![0.7; n],
      class_ids: vec![2; n],
    })
  }

  fn session_with_image() -> Session {
    let mut session = Session::default();
    session.replace_image(LoadedImage {
      source: "测试".to_string(),
      image: RgbImage::new(8, 8),
    });
    session
  }

  #[test]
  fn detect_without_image_fails() {
    let service = DetectionService::new(StubLoader::new(vec![]), ClassTable::coco());
    let mut session = Session::default();
    assert!(matches!(
      service.detect(&mut session),
      Err(DetectError::NoImage)
    ));
    assert_eq!(service.loader.loads.get(), 0);
  }

  #[test]
  fn model_is_loaded_once_per_variant() {
    let service = DetectionService::new(StubLoader::new(vec![Ok(cars(1)), Ok(cars(2))]), ClassTable::coco());
    let mut session = session_with_image();

    assert_eq!(
      service.detect(&mut session).unwrap(),
      DetectionOutcome::Detected(1)
    );
    assert_eq!(
      service.detect(&mut session).unwrap(),
      DetectionOutcome::Detected(2)
    );
    assert_eq!(service.loader.loads.get(), 1);
    assert!(service.cache().contains(ModelVariant::Nano));
  }

  #[test]
  fn failures_keep_previous_result() {
    let script = vec![Ok(cars(3)), Ok(None), Err(()), Ok(Some(RawPredictions {
      boxes: vec![[0.0, 0.0, 1.0, 1.0]],
      scores: vec![0.5],
      class_ids: vec![99],
    }))];
    let service = DetectionService::new(StubLoader::new(script), ClassTable::coco());
    let mut session = session_with_image();

    service.detect(&mut session).unwrap();
    let before = session.result().cloned();
    assert_eq!(before.as_ref().map(DetectionResult::len), Some(3));

    assert_eq!(
      service.detect(&mut session).unwrap(),
      DetectionOutcome::NoResult
    );
    assert_eq!(session.result(), before.as_ref());

    assert!(matches!(
      service.detect(&mut session),
      Err(DetectError::Inference(_))
    ));
    assert_eq!(session.result(), before.as_ref());

    assert!(matches!(
      service.detect(&mut session),
      Err(DetectError::Normalize(NormalizeError::UnknownClass { .. }))
    ));
    assert_eq!(session.result(), before.as_ref());
  }

  #[test]
  fn load_failure_is_reported_and_not_cached() {
    let mut loader = StubLoader::new(vec![Ok(cars(1))]);
    loader.available = false;
    let service = DetectionService::new(loader, ClassTable::coco());
    let mut session = session_with_image();

    let err = service.detect(&mut session).unwrap_err();
    assert!(matches!(
      err,
      DetectError::ModelLoad {
        variant: ModelVariant::Nano,
        ..
      }
    ));
    assert!(session.result().is_none());
    assert!(service.cache().is_empty());
  }

  #[test]
  fn timing_is_recorded_only_in_debug_mode() {
    let service = DetectionService::new(StubLoader::new(vec![Ok(cars(1)), Ok(cars(1))]), ClassTable::coco());
    let mut session = session_with_image();

    service.detect(&mut session).unwrap();
    assert_eq!(session.result().unwrap().inference_time_ms(), None);

    session.settings_mut().debug = true;
    service.detect(&mut session).unwrap();
    assert!(session.result().unwrap().inference_time_ms().is_some());
  }

  #[test]
  fn statistics_follow_current_result() {
    let service = DetectionService::new(StubLoader::new(vec![Ok(cars(2))]), ClassTable::coco());
    let mut session = session_with_image();
    assert!(session.statistics().is_none());

    service.detect(&mut session).unwrap();
    let stats = session.statistics().unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.per_class_counts.get("car"), Some(&2));
  }

  #[test]
  fn new_image_clears_result_and_failed_load_keeps_state() {
    let service = DetectionService::new(StubLoader::new(vec![Ok(cars(1))]), ClassTable::coco());
    let mut session = session_with_image();
    service.detect(&mut session).unwrap();

    let missing = ImageSource::File(PathBuf::from("/nonexistent/photo.png"));
    assert!(service.load_image(&mut session, &missing).is_err());
    assert!(session.result().is_some());
    assert_eq!(session.image().unwrap().source, "测试");

    session.replace_image(LoadedImage {
      source: "另一张".to_string(),
      image: RgbImage::new(4, 4),
    });
    assert!(session.result().is_none());
    assert!(session.annotate(&Settings::default().renderer().unwrap()).is_none());
  }
}
