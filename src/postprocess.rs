// 该文件是 Tehai （手牌） 项目的一部分。
// src/postprocess.rs - YOLOv8 检测头后处理
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

use tracing::debug;

use crate::{error::DetectError, model::RawOutput, preprocess::PaddingInfo};

mod assemble;
mod decode;
mod filter;
mod nms;
mod remap;

pub use self::assemble::{DetectItem, DetectResult, assemble};
pub use self::decode::decode;
pub use self::filter::filter_by_confidence;
pub use self::nms::{iou, nms};
pub use self::remap::remap;

/// 单个锚点解码后的候选框，坐标位于模型输入空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub bbox: [f32; 4], // [x1, y1, x2, y2]
  pub class_id: usize,
  pub confidence: f32,
}

/// 映射回原图像素坐标的检测结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub x1: u32,
  pub y1: u32,
  pub x2: u32,
  pub y2: u32,
  pub class_id: usize,
  pub confidence: f32,
}

impl Detection {
  pub fn from_candidate(candidate: &Candidate, padding: &PaddingInfo) -> Self {
    let [x1, y1, x2, y2] = remap(&candidate.bbox, padding);
    Detection {
      x1,
      y1,
      x2,
      y2,
      class_id: candidate.class_id,
      confidence: candidate.confidence,
    }
  }

  pub fn bbox(&self) -> [u32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }
}

/// 解码、置信度过滤、坐标映射与非极大值抑制。
///
/// 返回的检测结果按 NMS 选中顺序排列（置信度从高到低）。
pub fn postprocess(
  output: &RawOutput,
  padding: &PaddingInfo,
  num_classes: usize,
  conf_threshold: f32,
  iou_threshold: f32,
) -> Result<Vec<Detection>, DetectError> {
  let candidates = decode(output, num_classes)?;
  let total = candidates.len();

  let candidates = filter_by_confidence(candidates, conf_threshold);
  debug!("置信度过滤: {} -> {}", total, candidates.len());
  if candidates.is_empty() {
    return Ok(Vec::new());
  }

  let detections: Vec<Detection> = candidates
    .iter()
    .map(|c| Detection::from_candidate(c, padding))
    .collect();

  let boxes: Vec<[u32; 4]> = detections.iter().map(Detection::bbox).collect();
  let scores: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
  let keep = nms(&boxes, &scores, iou_threshold);
  debug!("非极大值抑制: {} -> {}", detections.len(), keep.len());

  Ok(keep.into_iter().map(|i| detections[i]).collect())
}
