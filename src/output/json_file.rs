// 该文件是 Tehai （手牌） 项目的一部分。
// src/output/json_file.rs - JSON Lines 文件输出
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

use std::{
  fs::{File, OpenOptions},
  io::Write,
  path::{Path, PathBuf},
  sync::Mutex,
};

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::InputFrame,
  label::WithLabel,
  output::{Render, result_to_json},
  postprocess::DetectResult,
};

#[derive(Error, Debug)]
pub enum JsonFileOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("文件锁已损坏")]
  Poisoned,
}

/// 每帧一行 JSON 追加写入文件，`json:///path/to/result.jsonl`
pub struct JsonFileOutput {
  path: PathBuf,
  file: Mutex<File>,
}

impl FromUrlWithScheme for JsonFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonFileOutput {
  type Error = JsonFileOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonFileOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    Self::create(uri.path())
  }
}

impl JsonFileOutput {
  pub fn create(path: impl AsRef<Path>) -> Result<Self, JsonFileOutputError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    info!("检测结果写入: {}", path.display());
    Ok(Self {
      path,
      file: Mutex::new(file),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl<T: WithLabel> Render<InputFrame, DetectResult<T>> for JsonFileOutput {
  type Error = JsonFileOutputError;

  fn render_result(&self, frame: &InputFrame, result: &DetectResult<T>) -> Result<(), Self::Error> {
    let line = serde_json::to_string(&result_to_json(&frame.name, result))?;
    let mut file = self.file.lock().map_err(|_| JsonFileOutputError::Poisoned)?;
    writeln!(file, "{}", line)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{label::Tile, postprocess::DetectItem};
  use image::{DynamicImage, GrayImage};

  #[test]
  fn each_frame_appends_one_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("result.jsonl");
    let output = JsonFileOutput::create(&path).unwrap();

    let frame = InputFrame {
      name: "hand.png".to_string(),
      image: DynamicImage::ImageLuma8(GrayImage::new(1, 1)),
    };
    let result = DetectResult {
      items: vec![DetectItem {
        kind: Tile::from_label_id(8).unwrap(),
        score: 0.75,
        bbox: [3, 4, 5, 6],
      }]
      .into_boxed_slice(),
    };
    output.render_result(&frame, &result).unwrap();
    output
      .render_result(&frame, &DetectResult::<Tile> { items: Box::new([]) })
      .unwrap();

    let text = std::fs::read_to_string(output.path()).unwrap();
    let lines: Vec<serde_json::Value> = text
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["tiles"], serde_json::json!(["3s"]));
    assert_eq!(lines[1]["tiles"], serde_json::json!([]));
  }
}
