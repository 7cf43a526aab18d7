// 该文件是 Tehai （手牌） 项目的一部分。
// src/postprocess/decode.rs - 检测头输出解码
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

use crate::{error::DetectError, model::RawOutput, postprocess::Candidate};

const BOX_ROWS: usize = 4;

/// 将 [4 + C, A] 的原始输出解码为 A 个候选框。
///
/// 每个锚点取 C 个类别分数中的最大值作为置信度，
/// 分数相同时取编号最小的类别。
pub fn decode(output: &RawOutput, num_classes: usize) -> Result<Vec<Candidate>, DetectError> {
  let expected_rows = BOX_ROWS + num_classes;
  if output.rows() != expected_rows {
    return Err(DetectError::shape_mismatch(
      format!("[{}, {}]", expected_rows, output.anchors()),
      &output.shape(),
    ));
  }
  if num_classes == 0 {
    return Ok(Vec::new());
  }

  let anchors = output.anchors();
  let mut best_conf = output.row(BOX_ROWS).to_vec();
  let mut best_class = vec![0usize; anchors];

  for c in 1..num_classes {
    for (a, &score) in output.row(BOX_ROWS + c).iter().enumerate() {
      if score > best_conf[a] {
        best_conf[a] = score;
        best_class[a] = c;
      }
    }
  }

  let (xc, yc) = (output.row(0), output.row(1));
  let (w, h) = (output.row(2), output.row(3));

  let candidates = (0..anchors)
    .map(|a| {
      let (half_w, half_h) = (w[a] / 2.0, h[a] / 2.0);
      Candidate {
        bbox: [xc[a] - half_w, yc[a] - half_h, xc[a] + half_w, yc[a] + half_h],
        class_id: best_class[a],
        confidence: best_conf[a],
      }
    })
    .collect();

  Ok(candidates)
}
