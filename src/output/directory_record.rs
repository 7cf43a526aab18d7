// 该文件是 Tehai （手牌） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
use std::sync::Mutex;

use chrono::{Datelike, Local};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::InputFrame,
  label::Tile,
  output::{Render, result_to_json},
  postprocess::DetectResult,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[cfg(feature = "save_image_file")]
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 按日期分目录保存每帧的检测记录，`folder:///path/to/records?always&image`
///
/// - `always`: 没有识别到牌时也写入记录
/// - `image`: 同时保存标注后的图像
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: Mutex<u16>,
  always: bool,
  #[cfg(feature = "save_image_file")]
  with_image: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counter: Mutex::new(0),
      always,
      #[cfg(feature = "save_image_file")]
      with_image: uri.query_pairs().any(|(k, _)| k == "image"),
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl AsRef<Path>) -> Self {
    DirectoryRecordOutput {
      directory: directory.as_ref().to_path_buf(),
      frame_counter: Mutex::new(0),
      always: false,
      #[cfg(feature = "save_image_file")]
      with_image: false,
    }
  }

  pub fn always(mut self, always: bool) -> Self {
    self.always = always;
    self
  }

  fn frame_id(&self) -> u16 {
    let mut counter = match self.frame_counter.lock() {
      Ok(counter) => counter,
      Err(poisoned) => poisoned.into_inner(),
    };
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Local::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<InputFrame, DetectResult<Tile>> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(
    &self,
    frame: &InputFrame,
    result: &DetectResult<Tile>,
  ) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let path = self.frame_path()?;
    let record = serde_json::to_string_pretty(&result_to_json(&frame.name, result))?;
    std::fs::write(path.with_extension("json"), record)?;
    debug!("记录写入: {}", path.display());

    #[cfg(feature = "save_image_file")]
    if self.with_image {
      let image = crate::output::draw::Draw::default().draw_detection(&frame.image, result);
      image.save(path.with_extension("png"))?;
    }

    Ok(())
  }
}
