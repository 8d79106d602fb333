// 该文件是 Jianwei （见微） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use url::Url;

use jianwei::{
  input::FetchOptions,
  model::{ModelVariant, ThresholdError, Thresholds},
  output::draw::DrawOptions,
  session::Settings,
};

/// Jianwei 目标检测演示
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源，例如 replay:///path/to/fixtures
  #[arg(
    long,
    value_name = "MODEL_SOURCE",
    required_unless_present_any = ["list_models", "list_samples"]
  )]
  pub model_source: Option<Url>,

  /// 模型规模
  #[arg(long, value_enum, default_value_t = ModelVariant::Nano)]
  pub model: ModelVariant,

  /// 输入来源
  /// 支持格式:
  /// - 本地图片: *.png, *.jpg, *.jpeg, *.bmp, *.tiff 或 image:///path
  /// - 远程图片: http(s)://...
  /// - 示例图片: sample://street
  /// - V4L2: v4l:///dev/video0
  #[arg(
    long,
    value_name = "SOURCE",
    required_unless_present_any = ["list_models", "list_samples"]
  )]
  pub input: Option<String>,

  /// 标注图像输出路径，例如 image:///tmp/out/
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 检测记录（JSON）输出路径
  #[arg(long, value_name = "FILE")]
  pub record: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = Thresholds::DEFAULT_CONFIDENCE, value_parser = parse_threshold, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = Thresholds::DEFAULT_IOU, value_parser = parse_threshold, value_name = "THRESHOLD")]
  pub iou: f32,

  /// 不绘制检测框
  #[arg(long)]
  pub hide_boxes: bool,

  /// 不绘制类别标签
  #[arg(long)]
  pub hide_labels: bool,

  /// 标签中不显示置信度
  #[arg(long)]
  pub hide_confidence: bool,

  /// 调试模式：输出详细日志、推理耗时与检测详情
  #[arg(long)]
  pub debug: bool,

  /// 远程图像获取超时（秒）
  #[arg(long, default_value_t = 10, value_name = "SECONDS")]
  pub timeout: u64,

  /// 标签字体文件
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,

  /// 类别名文件，每行一个类别，默认使用 COCO 80 类
  #[arg(long, value_name = "FILE")]
  pub classes: Option<PathBuf>,

  /// 列出可选模型后退出
  #[arg(long)]
  pub list_models: bool,

  /// 列出示例图像后退出
  #[arg(long)]
  pub list_samples: bool,
}

fn parse_threshold(value: &str) -> Result<f32, String> {
  let threshold: f32 = value.parse().map_err(|e| format!("{}", e))?;
  if (0.0..=1.0).contains(&threshold) {
    Ok(threshold)
  } else {
    Err(format!("阈值必须在 [0, 1] 之间，实际为 {}", threshold))
  }
}

impl Args {
  pub fn settings(&self) -> Result<Settings, ThresholdError> {
    Ok(Settings {
      model: self.model,
      thresholds: Thresholds::new(self.confidence, self.iou)?,
      draw: DrawOptions {
        show_boxes: !self.hide_boxes,
        show_labels: !self.hide_labels,
        show_confidence: !self.hide_confidence,
      },
      debug: self.debug,
      fetch: FetchOptions {
        timeout: Duration::from_secs(self.timeout),
        ..FetchOptions::default()
      },
      font: self.font.clone(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_detection_settings() {
    let args = Args::parse_from([
      "jianwei",
      "--model-source",
      "replay:///tmp/fixtures",
      "--input",
      "sample://street",
    ]);
    let settings = args.settings().unwrap();
    assert_eq!(settings.model, ModelVariant::Nano);
    assert_eq!(settings.thresholds, Thresholds::default());
    assert_eq!(settings.draw, DrawOptions::default());
    assert_eq!(settings.fetch.timeout, Duration::from_secs(10));
    assert!(!settings.debug);
  }

  #[test]
  fn toggles_and_thresholds_are_applied() {
    let args = Args::parse_from([
      "jianwei",
      "--model-source",
      "replay:///tmp/fixtures",
      "--input",
      "photo.png",
      "--model",
      "xlarge",
      "--confidence",
      "0.5",
      "--iou",
      "0.4",
      "--hide-labels",
      "--timeout",
      "3",
    ]);
    let settings = args.settings().unwrap();
    assert_eq!(settings.model, ModelVariant::XLarge);
    assert_eq!(settings.thresholds, Thresholds::new(0.5, 0.4).unwrap());
    assert!(settings.draw.show_boxes);
    assert!(!settings.draw.show_labels);
    assert_eq!(settings.fetch.timeout, Duration::from_secs(3));
  }

  #[test]
  fn out_of_range_threshold_is_rejected() {
    let parsed = Args::try_parse_from([
      "jianwei",
      "--model-source",
      "replay:///tmp/fixtures",
      "--input",
      "photo.png",
      "--confidence",
      "1.5",
    ]);
    assert!(parsed.is_err());
  }

  #[test]
  fn listing_needs_no_model_or_input() {
    let args = Args::try_parse_from(["jianwei", "--list-models"]).unwrap();
    assert!(args.list_models);
    assert!(args.model_source.is_none());
  }
}
