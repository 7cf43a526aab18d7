// 该文件是 Tehai （手牌） 项目的一部分。
// src/postprocess/nms.rs - 非极大值抑制
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

/// 两个 [x1, y1, x2, y2] 整数框的交并比，并集为零时返回 0
pub fn iou(a: &[u32; 4], b: &[u32; 4]) -> f64 {
  let [ax1, ay1, ax2, ay2] = a.map(i64::from);
  let [bx1, by1, bx2, by2] = b.map(i64::from);

  let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(0);
  let inter_h = (ay2.min(by2) - ay1.max(by1)).max(0);
  let intersection = inter_w * inter_h;

  let area_a = (ax2 - ax1) * (ay2 - ay1);
  let area_b = (bx2 - bx1) * (by2 - by1);
  let union = area_a + area_b - intersection;

  if union > 0 {
    intersection as f64 / union as f64
  } else {
    0.0
  }
}

/// 贪心非极大值抑制，不区分类别。
///
/// 按置信度降序依次选取，删除与已选框 IoU 大于阈值的其余框。
/// 返回保留框的下标，顺序即选取顺序；置信度相同时下标大的先选。
pub fn nms(boxes: &[[u32; 4]], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
  debug_assert_eq!(boxes.len(), scores.len());

  let mut order: Vec<usize> = (0..boxes.len().min(scores.len())).collect();
  // 置信度相同时后出现的锚点优先
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(b.cmp(&a)));

  let threshold = iou_threshold as f64;
  let mut keep = Vec::new();

  while !order.is_empty() {
    let best = order.remove(0);
    keep.push(best);
    order.retain(|&i| iou(&boxes[best], &boxes[i]) <= threshold);
  }

  keep
}
