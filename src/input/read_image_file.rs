// 该文件是 Jianwei （见微） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage};
use tracing::{debug, error};

use super::InputError;

/// 支持上传的图像扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tiff", "tif"];

fn check_extension(name: &Path) -> Result<(), InputError> {
  let extension = name
    .extension()
    .and_then(|ext| ext.to_str())
    .map(str::to_ascii_lowercase)
    .unwrap_or_default();

  if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
    Ok(())
  } else {
    error!("不支持的图像格式: {}", name.display());
    Err(InputError::UnsupportedFormat(name.display().to_string()))
  }
}

pub fn read_image_file(path: &Path) -> Result<RgbImage, InputError> {
  check_extension(path)?;
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  debug!(
    "图像文件读取完成: {} ({}x{})",
    path.display(),
    image.width(),
    image.height()
  );
  Ok(image.to_rgb8())
}

/// 解码上传的图像内容，`name` 为上传时的文件名
pub fn read_image_bytes(name: &str, bytes: &[u8]) -> Result<RgbImage, InputError> {
  check_extension(Path::new(name))?;
  let image = image::load_from_memory(bytes)?;
  debug!("上传图像解码完成: {} ({}x{})", name, image.width(), image.height());
  Ok(image.to_rgb8())
}
