// 该文件是 Jianwei （见微） 项目的一部分。
// src/model/cache.rs - 模型缓存
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
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::model::ModelVariant;

/// 按模型规模缓存已加载的模型，每种规模最多加载一次
///
/// 加载过程持有锁，同一规模的并发请求不会重复加载。
/// 加载失败不会写入缓存，下次请求会重新尝试。
pub struct ModelCache<M> {
  models: Mutex<HashMap<ModelVariant, Arc<M>>>,
}

impl<M> Default for ModelCache<M> {
  fn default() -> Self {
    Self::new()
  }
}

impl<M> ModelCache<M> {
  pub fn new() -> Self {
    Self {
      models: Mutex::new(HashMap::new()),
    }
  }

  pub fn get_or_load<E, F>(&self, variant: ModelVariant, load: F) -> Result<Arc<M>, E>
  where
    F: FnOnce(ModelVariant) -> Result<M, E>,
  {
    let mut models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(model) = models.get(&variant) {
      debug!("命中模型缓存: {}", variant);
      return Ok(Arc::clone(model));
    }

    info!("模型 {} 尚未加载，开始加载", variant);
    let model = Arc::new(load(variant)?);
    models.insert(variant, Arc::clone(&model));
    Ok(model)
  }

  pub fn contains(&self, variant: ModelVariant) -> bool {
    self
      .models
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(&variant)
  }

  pub fn len(&self) -> usize {
    self.models.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  #[test]
  fn loads_each_variant_once() {
    let cache = ModelCache::new();
    let loads = Cell::new(0);

    for _ in 0..3 {
      let model = cache
        .get_or_load(ModelVariant::Nano, |variant| {
          loads.set(loads.get() + 1);
          Ok::<_, String>(variant.file_stem())
        })
        .unwrap();
      assert_eq!(*model, "yolov8n");
    }

    assert_eq!(loads.get(), 1);
    assert!(cache.contains(ModelVariant::Nano));
    assert!(!cache.contains(ModelVariant::Small));
  }

  #[test]
  fn variants_are_cached_independently() {
    let cache = ModelCache::new();
    cache
      .get_or_load(ModelVariant::Nano, |v| Ok::<_, String>(v))
      .unwrap();
    cache
      .get_or_load(ModelVariant::Large, |v| Ok::<_, String>(v))
      .unwrap();
    assert_eq!(cache.len(), 2);
  }

  #[test]
  fn failed_load_is_not_cached() {
    let cache: ModelCache<u32> = ModelCache::new();
    let err = cache
      .get_or_load(ModelVariant::Small, |_| Err("权重文件缺失"))
      .unwrap_err();
    assert_eq!(err, "权重文件缺失");
    assert!(cache.is_empty());

    let model = cache
      .get_or_load(ModelVariant::Small, |_| Ok::<_, &str>(7))
      .unwrap();
    assert_eq!(*model, 7);
  }
}
