// 该文件是 Jianwei （见微） 项目的一部分。
// src/input/fetch_url.rs - 远程图像获取
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

use std::io::Read;

use image::RgbImage;
use tracing::{debug, info, warn};

use super::{FetchOptions, InputError};

/// 通过 HTTP(S) 获取图像，确认响应成功后再解码
///
/// 超时、非 2xx 响应、内容过大或无法解码都作为可恢复的错误返回。
pub fn fetch_image(url: &str, options: &FetchOptions) -> Result<RgbImage, InputError> {
  info!("获取远程图像: {}", url);
  let agent = ureq::AgentBuilder::new().timeout(options.timeout).build();

  let response = agent.get(url).call().map_err(|err| match err {
    ureq::Error::Status(status, _) => {
      warn!("远程图像请求失败: HTTP {}", status);
      InputError::HttpStatus {
        url: url.to_string(),
        status,
      }
    }
    other => {
      warn!("远程图像请求失败: {}", other);
      InputError::Fetch {
        url: url.to_string(),
        source: Box::new(other),
      }
    }
  })?;

  let status = response.status();
  if !(200..300).contains(&status) {
    warn!("远程图像请求失败: HTTP {}", status);
    return Err(InputError::HttpStatus {
      url: url.to_string(),
      status,
    });
  }
  debug!("远程响应: HTTP {} {}", status, response.content_type());

  let mut bytes = Vec::new();
  response
    .into_reader()
    .take(options.max_bytes + 1)
    .read_to_end(&mut bytes)?;
  if bytes.len() as u64 > options.max_bytes {
    return Err(InputError::TooLarge(options.max_bytes));
  }
  debug!("远程图像大小: {:.2} KB", bytes.len() as f64 / 1024.0);

  let image = image::load_from_memory(&bytes)?;
  Ok(image.to_rgb8())
}
