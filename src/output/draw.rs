// 该文件是 Jianwei （见微） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
  rect::Rect,
};

use crate::{
  detection::{DetectionItem, DetectionResult},
  output::font::LabelFont,
};

const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_PADDING: u32 = 2;
const BOX_THICKNESS: i32 = 3;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// 按检测项序号循环取色，与类别无关
pub const PALETTE: [Rgb<u8>; 10] = [
  Rgb([0xFF, 0x00, 0x00]),
  Rgb([0x00, 0xFF, 0x00]),
  Rgb([0x00, 0x00, 0xFF]),
  Rgb([0xFF, 0xFF, 0x00]),
  Rgb([0xFF, 0x00, 0xFF]),
  Rgb([0x00, 0xFF, 0xFF]),
  Rgb([0xFF, 0xA5, 0x00]),
  Rgb([0x80, 0x00, 0x80]),
  Rgb([0x00, 0x80, 0x00]),
  Rgb([0x80, 0x00, 0x00]),
];

pub fn palette_color(position: usize) -> Rgb<u8> {
  PALETTE[position % PALETTE.len()]
}

/// 显示开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOptions {
  pub show_boxes: bool,
  pub show_labels: bool,
  pub show_confidence: bool,
}

impl Default for DrawOptions {
  fn default() -> Self {
    Self {
      show_boxes: true,
      show_labels: true,
      show_confidence: true,
    }
  }
}

impl DrawOptions {
  /// 标签文本；关闭标签时返回 `None`
  pub fn label_text(&self, item: &DetectionItem) -> Option<String> {
    if !self.show_labels {
      return None;
    }
    if self.show_confidence {
      Some(format!("{}: {:.3}", item.class_name(), item.confidence()))
    } else {
      Some(item.class_name().to_string())
    }
  }
}

#[derive(Debug, Clone)]
pub struct Draw {
  font: LabelFont,
  font_size: f32,
  options: DrawOptions,
}

impl Draw {
  pub fn new(font: LabelFont, options: DrawOptions) -> Self {
    Self {
      font,
      font_size: LABEL_FONT_SIZE,
      options,
    }
  }

  /// 在原图副本上绘制检测结果，原图不变
  pub fn annotate(&self, image: &RgbImage, result: &DetectionResult) -> RgbImage {
    let mut annotated = image.clone();
    self.draw_detections_on_image(&mut annotated, result);
    annotated
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectionResult) {
    for (position, item) in result.items().iter().enumerate() {
      let color = palette_color(position);
      let Some(bounds) = pixel_box(image, item.bbox()) else {
        continue;
      };

      if self.options.show_boxes {
        draw_box(image, bounds, color);
      }
      if let Some(label) = self.options.label_text(item) {
        self.draw_label(image, bounds, color, &label);
      }
    }
  }

  fn draw_label(&self, image: &mut RgbImage, bounds: PixelBox, color: Rgb<u8>, label: &str) {
    let (text_width, text_height) = self.font.text_size(self.font_size, label);
    let width = text_width + 2 * LABEL_PADDING;
    let height = text_height + 2 * LABEL_PADDING;

    // 标签放在框左上角上方，放不下时移到框内
    let x = bounds.x0;
    let mut y = bounds.y0 - height as i32;
    if y < 0 {
      y = bounds.y0;
    }

    draw_filled_rect_mut(image, Rect::at(x, y).of_size(width, height), color);
    self.font.draw_text(
      image,
      TEXT_COLOR,
      x + LABEL_PADDING as i32,
      y + LABEL_PADDING as i32,
      self.font_size,
      label,
    );
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelBox {
  x0: i32,
  y0: i32,
  x1: i32,
  y1: i32,
}

// 像素坐标框裁剪到图像范围内，完全落在图像外的框不绘制
fn pixel_box(image: &RgbImage, bbox: &[f32; 4]) -> Option<PixelBox> {
  if image.width() == 0 || image.height() == 0 {
    return None;
  }
  let (width, height) = (image.width() as f32, image.height() as f32);
  if bbox[2] < 0.0 || bbox[3] < 0.0 || bbox[0] >= width || bbox[1] >= height {
    return None;
  }
  let (max_x, max_y) = (image.width() as i32 - 1, image.height() as i32 - 1);

  let x0 = (bbox[0].floor() as i32).clamp(0, max_x);
  let y0 = (bbox[1].floor() as i32).clamp(0, max_y);
  let x1 = (bbox[2].ceil() as i32).clamp(0, max_x);
  let y1 = (bbox[3].ceil() as i32).clamp(0, max_y);

  (x0 <= x1 && y0 <= y1).then_some(PixelBox { x0, y0, x1, y1 })
}

fn draw_box(image: &mut RgbImage, bounds: PixelBox, color: Rgb<u8>) {
  for t in 0..BOX_THICKNESS {
    let width = bounds.x1 - bounds.x0 - 2 * t + 1;
    let height = bounds.y1 - bounds.y0 - 2 * t + 1;
    if width <= 0 || height <= 0 {
      break;
    }
    let rect = Rect::at(bounds.x0 + t, bounds.y0 + t).of_size(width as u32, height as u32);
    draw_hollow_rect_mut(image, rect, color);
  }
}
