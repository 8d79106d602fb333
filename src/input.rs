// 该文件是 Jianwei （见微） 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::FromUrl;

mod read_image_file;
pub use self::read_image_file::{SUPPORTED_EXTENSIONS, read_image_bytes, read_image_file};

#[cfg(feature = "fetch_url")]
mod fetch_url;
#[cfg(feature = "fetch_url")]
pub use self::fetch_url::fetch_image;

#[cfg(feature = "v4l_input")]
mod v4l_input;
#[cfg(feature = "v4l_input")]
pub use self::v4l_input::capture_frame;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("不支持的图像格式: {0}")]
  UnsupportedFormat(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("未知的示例图像: {0}")]
  UnknownSample(String),
  #[cfg(feature = "fetch_url")]
  #[error("获取远程图像失败 {url}: {source}")]
  Fetch {
    url: String,
    #[source]
    source: Box<ureq::Error>,
  },
  #[error("远程图像请求失败 {url}: HTTP {status}")]
  HttpStatus { url: String, status: u16 },
  #[error("远程图像超过 {0} 字节上限")]
  TooLarge(u64),
  #[error("未启用远程图像获取功能")]
  FetchUnavailable,
  #[error("摄像头错误: {0}")]
  Camera(String),
  #[error("未启用摄像头输入功能")]
  CameraUnavailable,
}

/// 远程获取参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
  pub timeout: Duration,
  pub max_bytes: u64,
}

impl Default for FetchOptions {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(10),
      max_bytes: 20 * 1024 * 1024,
    }
  }
}

/// 内置示例图像
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleImage {
  Office,
  Kitchen,
  LivingRoom,
  Street,
  Nature,
  Portrait,
  Car,
}

impl SampleImage {
  pub const ALL: [SampleImage; 7] = [
    SampleImage::Office,
    SampleImage::Kitchen,
    SampleImage::LivingRoom,
    SampleImage::Street,
    SampleImage::Nature,
    SampleImage::Portrait,
    SampleImage::Car,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      SampleImage::Office => "office",
      SampleImage::Kitchen => "kitchen",
      SampleImage::LivingRoom => "living-room",
      SampleImage::Street => "street",
      SampleImage::Nature => "nature",
      SampleImage::Portrait => "portrait",
      SampleImage::Car => "car",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      SampleImage::Office => "办公室",
      SampleImage::Kitchen => "厨房",
      SampleImage::LivingRoom => "客厅",
      SampleImage::Street => "街景",
      SampleImage::Nature => "自然风光",
      SampleImage::Portrait => "人像",
      SampleImage::Car => "汽车",
    }
  }

  pub fn url(&self) -> &'static str {
    match self {
      SampleImage::Office => {
        "https://images.unsplash.com/photo-1497366216548-37526070297c?w=800&h=600&fit=crop"
      }
      SampleImage::Kitchen => {
        "https://images.unsplash.com/photo-1556909114-f6e7ad7d3136?w=800&h=600&fit=crop"
      }
      SampleImage::LivingRoom => {
        "https://images.unsplash.com/photo-1586023492125-27b2c045efd7?w=800&h=600&fit=crop"
      }
      SampleImage::Street => {
        "https://images.unsplash.com/photo-1449824913935-59a10b8d2000?w=800&h=600&fit=crop"
      }
      SampleImage::Nature => {
        "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=800&h=600&fit=crop"
      }
      SampleImage::Portrait => {
        "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=800&h=600&fit=crop"
      }
      SampleImage::Car => {
        "https://images.unsplash.com/photo-1549317661-bd32c8ce0db2?w=800&h=600&fit=crop"
      }
    }
  }
}

impl FromStr for SampleImage {
  type Err = InputError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim().to_ascii_lowercase().replace('_', "-");
    SampleImage::ALL
      .into_iter()
      .find(|sample| sample.name() == name)
      .ok_or_else(|| InputError::UnknownSample(s.to_string()))
  }
}

/// 输入图像来源，所有来源都统一为 RGB 图像
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
  /// 本地图像文件
  File(PathBuf),
  /// 已上传的文件内容
  Upload { name: String, bytes: Vec<u8> },
  /// 远程图像地址
  Url(Url),
  Sample(SampleImage),
  /// V4L2 摄像头设备
  Camera(PathBuf),
}

const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

impl FromUrl for ImageSource {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "image" | "file" => Ok(ImageSource::File(crate::url_path(url))),
      "http" | "https" => Ok(ImageSource::Url(url.clone())),
      "sample" => {
        let name = url
          .host_str()
          .filter(|host| !host.is_empty())
          .map(str::to_string)
          .unwrap_or_else(|| url.path().trim_matches('/').to_string());
        Ok(ImageSource::Sample(name.parse()?))
      }
      "v4l" => {
        let device = crate::url_path(url);
        if device.as_os_str().is_empty() {
          Ok(ImageSource::Camera(PathBuf::from(DEFAULT_CAMERA_DEVICE)))
        } else {
          Ok(ImageSource::Camera(device))
        }
      }
      scheme => {
        error!("URI scheme mismatch: unsupported input scheme '{}'", scheme);
        Err(InputError::SchemeMismatch(scheme.to_string()))
      }
    }
  }
}

impl ImageSource {
  /// 解析命令行输入：合法 URL 按方案分派，其余视为本地文件路径
  pub fn parse(input: &str) -> Result<Self, InputError> {
    match Url::parse(input) {
      Ok(url) if url.scheme().len() > 1 => Self::from_url(&url),
      _ => Ok(ImageSource::File(PathBuf::from(input))),
    }
  }

  pub fn load(&self, options: &FetchOptions) -> Result<RgbImage, InputError> {
    debug!("读取输入图像: {}", self);
    match self {
      ImageSource::File(path) => read_image_file(path),
      ImageSource::Upload { name, bytes } => read_image_bytes(name, bytes),
      ImageSource::Url(url) => fetch(url.as_str(), options),
      ImageSource::Sample(sample) => fetch(sample.url(), options),
      ImageSource::Camera(device) => capture(device),
    }
  }
}

impl std::fmt::Display for ImageSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ImageSource::File(path) => write!(f, "文件 {}", path.display()),
      ImageSource::Upload { name, bytes } => write!(f, "上传 {} ({} 字节)", name, bytes.len()),
      ImageSource::Url(url) => write!(f, "URL {}", url),
      ImageSource::Sample(sample) => write!(f, "示例图像 {} ({})", sample.title(), sample.name()),
      ImageSource::Camera(device) => write!(f, "摄像头 {}", device.display()),
    }
  }
}

#[cfg(feature = "fetch_url")]
fn fetch(url: &str, options: &FetchOptions) -> Result<RgbImage, InputError> {
  fetch_image(url, options)
}

#[cfg(not(feature = "fetch_url"))]
fn fetch(_url: &str, _options: &FetchOptions) -> Result<RgbImage, InputError> {
  Err(InputError::FetchUnavailable)
}

#[cfg(feature = "v4l_input")]
fn capture(device: &std::path::Path) -> Result<RgbImage, InputError> {
  capture_frame(device)
}

#[cfg(not(feature = "v4l_input"))]
fn capture(_device: &std::path::Path) -> Result<RgbImage, InputError> {
  Err(InputError::CameraUnavailable)
}
