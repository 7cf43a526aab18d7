// 该文件是 Tehai （手牌） 项目的一部分。
// src/error.rs - 检测流程错误定义
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

use thiserror::Error;

/// 检测流程中可能出现的错误
#[derive(Error, Debug)]
pub enum DetectError {
  #[error("图像尺寸无效: {width}x{height}")]
  InvalidImage { width: u32, height: u32 },
  #[error("图像解码错误: {0}")]
  Decode(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("张量形状不匹配: 期望 {expected}, 实际 {actual:?}")]
  ShapeMismatch { expected: String, actual: Vec<usize> },
  #[error("类别索引越界: {class_id} (标签数量 {labels})")]
  ClassIndexOutOfRange { class_id: usize, labels: usize },
  #[error("推理错误: {0}")]
  Inference(Box<dyn std::error::Error + Send + Sync>),
}

impl DetectError {
  pub fn inference<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    DetectError::Inference(Box::new(err))
  }

  pub fn shape_mismatch(expected: impl Into<String>, actual: &[usize]) -> Self {
    DetectError::ShapeMismatch {
      expected: expected.into(),
      actual: actual.to_vec(),
    }
  }
}
