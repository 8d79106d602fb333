// 该文件是 Jianwei （见微） 项目的一部分。
// src/input/v4l_input.rs - V4L
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

use image::{ImageFormat, RgbImage};
use tracing::{debug, info};
use v4l::{
  Device, FourCC, buffer::Type, io::mmap::Stream, io::traits::CaptureStream, video::Capture,
};

use super::InputError;

const CAPTURE_BUFFERS: u32 = 4;

fn camera_error(err: std::io::Error) -> InputError {
  InputError::Camera(err.to_string())
}

/// 从 V4L2 设备采集一帧，支持 MJPG、YUYV 和 RGB3 像素格式
pub fn capture_frame(device_path: &Path) -> Result<RgbImage, InputError> {
  info!("打开摄像头: {}", device_path.display());
  let device = Device::with_path(device_path).map_err(camera_error)?;

  let mut format = device.format().map_err(camera_error)?;
  format.fourcc = FourCC::new(b"MJPG");
  let format = device.set_format(&format).map_err(camera_error)?;
  debug!(
    "摄像头格式: {}x{} {}",
    format.width,
    format.height,
    String::from_utf8_lossy(&format.fourcc.repr)
  );

  let mut stream =
    Stream::with_buffers(&device, Type::VideoCapture, CAPTURE_BUFFERS).map_err(camera_error)?;
  let (buf, meta) = stream.next().map_err(camera_error)?;
  let used = match meta.bytesused as usize {
    0 => buf.len(),
    n => n.min(buf.len()),
  };
  let data = &buf[..used];

  match &format.fourcc.repr {
    b"MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8()),
    b"YUYV" => yuyv_to_rgb(data, format.width, format.height),
    b"RGB3" => RgbImage::from_raw(format.width, format.height, data.to_vec())
      .ok_or_else(|| InputError::Camera("采集数据长度不足".to_string())),
    other => Err(InputError::UnsupportedFormat(
      String::from_utf8_lossy(other).into_owned(),
    )),
  }
}

/// YUYV 4:2:2 转 RGB（BT.601）
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage, InputError> {
  let pixels = width as usize * height as usize;
  if data.len() < pixels * 2 {
    return Err(InputError::Camera("采集数据长度不足".to_string()));
  }

  let mut rgb = Vec::with_capacity(pixels * 3);
  for chunk in data[..pixels * 2].chunks_exact(4) {
    let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
    for y in [y0, y1] {
      rgb.extend_from_slice(&yuv_to_rgb(y, u, v));
    }
  }

  RgbImage::from_raw(width, height, rgb)
    .ok_or_else(|| InputError::Camera("采集数据长度不足".to_string()))
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
  let c = f32::from(y) - 16.0;
  let d = f32::from(u) - 128.0;
  let e = f32::from(v) - 128.0;
  let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
  [
    clamp(1.164 * c + 1.596 * e),
    clamp(1.164 * c - 0.392 * d - 0.813 * e),
    clamp(1.164 * c + 2.017 * d),
  ]
}
