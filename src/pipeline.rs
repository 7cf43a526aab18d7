// 该文件是 Tehai （手牌） 项目的一部分。
// src/pipeline.rs - 从图像到手牌标签的完整流程
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

use image::DynamicImage;
use tracing::debug;

use crate::{
  error::DetectError,
  frame::{ModelInput, TARGET_SIZE},
  input::ImageSource,
  label::{TILE_CLASS_NUM, Tile},
  model::Model,
  postprocess::{DetectResult, assemble, postprocess},
  preprocess::letterbox,
};

const DEFAULT_CONF_THRESHOLD: f32 = 0.5;
const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
  /// 置信度阈值，严格大于才保留
  pub conf_threshold: f32,
  /// NMS 交并比阈值，大于即抑制
  pub iou_threshold: f32,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      conf_threshold: DEFAULT_CONF_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
    }
  }
}

impl PipelineConfig {
  pub fn conf_threshold(mut self, threshold: f32) -> Self {
    self.conf_threshold = threshold;
    self
  }

  pub fn iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }
}

/// 手牌检测器。
///
/// 独占一个推理引擎实例；并发使用时每个工作线程各自构建一个 `Detector`。
pub struct Detector<M> {
  model: M,
  config: PipelineConfig,
}

impl<M: Model> Detector<M> {
  pub fn new(model: M) -> Self {
    Self {
      model,
      config: PipelineConfig::default(),
    }
  }

  pub fn with_config(mut self, config: PipelineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn into_model(self) -> M {
    self.model
  }

  /// 检测已解码的图像，结果从左到右排列
  pub fn detect_image(&mut self, image: &DynamicImage) -> Result<DetectResult<Tile>, DetectError> {
    let now = std::time::Instant::now();
    let (frame, padding) = letterbox::<TARGET_SIZE>(image)?;
    let input = ModelInput::build(&frame, self.model.input_kind());
    let preprocessed = now.elapsed();

    let output = self.model.infer(&input).map_err(DetectError::inference)?;
    let inferred = now.elapsed();

    let detections = postprocess(
      &output,
      &padding,
      TILE_CLASS_NUM,
      self.config.conf_threshold,
      self.config.iou_threshold,
    )?;
    let result = assemble(detections)?;

    debug!(
      "预处理 {:.2?}, 推理 {:.2?}, 后处理 {:.2?}, 识别 {} 张牌",
      preprocessed,
      inferred - preprocessed,
      now.elapsed() - inferred,
      result.len()
    );

    Ok(result)
  }

  pub fn detect(&mut self, source: impl Into<ImageSource>) -> Result<DetectResult<Tile>, DetectError> {
    let image = source.into().decode()?;
    self.detect_image(&image)
  }

  pub fn detect_tiles(
    &mut self,
    source: impl Into<ImageSource>,
  ) -> Result<Vec<&'static str>, DetectError> {
    self.detect(source).map(|result| result.labels())
  }
}

/// 识别图像中的手牌，按从左到右的顺序返回牌名
pub fn detect_tiles<M: Model>(
  model: &mut M,
  source: impl Into<ImageSource>,
) -> Result<Vec<&'static str>, DetectError> {
  Detector::new(model).detect_tiles(source)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_thresholds() {
    let config = PipelineConfig::default();
    assert_eq!(config.conf_threshold, 0.5);
    assert_eq!(config.iou_threshold, 0.5);

    let config = config.conf_threshold(0.25).iou_threshold(0.7);
    assert_eq!((config.conf_threshold, config.iou_threshold), (0.25, 0.7));
  }
}
