// 该文件是 Jianwei （见微） 项目的一部分。
// src/output/font.rs - 标签字体
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 指定字体文件的环境变量
pub const FONT_ENV_VAR: &str = "JIANWEI_FONT";

// DejaVu Sans，许可见 assets/FONT_LICENSE
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

const SYSTEM_FONT_CANDIDATES: [&str; 10] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
  "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
  "/usr/share/fonts/opentype/ipaexfont-gothic/ipaexg.ttf",
  "/usr/share/fonts/truetype/fonts-japanese-gothic.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "/Library/Fonts/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum FontError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效的字体文件: {0}")]
  InvalidFont(PathBuf),
  #[error("无法加载嵌入的字体文件")]
  InvalidBundledFont,
}

/// 标签文字使用的 TrueType 字体
#[derive(Clone)]
pub struct LabelFont {
  font: FontArc,
  source: Option<PathBuf>,
}

impl std::fmt::Debug for LabelFont {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.source {
      Some(path) => write!(f, "LabelFont({})", path.display()),
      None => write!(f, "LabelFont(<bundled>)"),
    }
  }
}

impl LabelFont {
  pub fn load(path: &Path) -> Result<Self, FontError> {
    let data = std::fs::read(path)?;
    let font =
      FontArc::try_from_vec(data).map_err(|_| FontError::InvalidFont(path.to_path_buf()))?;
    Ok(Self {
      font,
      source: Some(path.to_path_buf()),
    })
  }

  /// 随程序编译进来的字体
  pub fn bundled() -> Result<Self, FontError> {
    let font = FontArc::try_from_slice(BUNDLED_FONT).map_err(|_| FontError::InvalidBundledFont)?;
    Ok(Self { font, source: None })
  }

  /// 依次尝试指定字体、环境变量和系统常见字体，都不可用时使用内置字体
  pub fn discover(preferred: Option<&Path>) -> Result<Self, FontError> {
    if let Some(path) = preferred {
      match Self::load(path) {
        Ok(font) => return Ok(font),
        Err(e) => warn!("无法加载指定字体 {}: {}", path.display(), e),
      }
    }

    let candidates = std::env::var_os(FONT_ENV_VAR)
      .map(PathBuf::from)
      .into_iter()
      .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
      match Self::load(&path) {
        Ok(font) => {
          info!("使用字体: {}", path.display());
          return Ok(font);
        }
        Err(e) => debug!("跳过字体 {}: {}", path.display(), e),
      }
    }

    info!("未找到系统字体，使用内置字体");
    Self::bundled()
  }

  pub fn text_size(&self, size: f32, text: &str) -> (u32, u32) {
    text_size(PxScale::from(size), &self.font, text)
  }

  pub fn draw_text(
    &self,
    image: &mut RgbImage,
    color: Rgb<u8>,
    x: i32,
    y: i32,
    size: f32,
    text: &str,
  ) {
    draw_text_mut(image, color, x, y, PxScale::from(size), &self.font, text);
  }
}
