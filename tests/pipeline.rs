// 该文件是 Tehai （手牌） 项目的一部分。
// tests/pipeline.rs - 使用模拟推理引擎的端到端测试
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
  convert::Infallible,
  io::Cursor,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  thread,
  time::Duration,
};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tehai::{
  DetectError, DetectResult, Detector, Model, PipelineConfig, RawOutput, TILE_LABELS, Tile,
  WithLabel, detect_tiles,
  frame::{InputKind, ModelInput, TARGET_SIZE},
  input::{InputFrame, LoadFrame},
  label::TILE_CLASS_NUM,
  output::Render,
  task::{OneShotTask, ParallelTask, Task},
};

/// 一个锚点: 信箱坐标下的 (cx, cy, w, h)、类别、置信度
type Anchor = (f32, f32, f32, f32, usize, f32);

fn raw_output(rows: usize, anchors: &[Anchor]) -> RawOutput {
  let n = anchors.len();
  let mut data = vec![0f32; rows * n];
  for (i, &(cx, cy, w, h, class_id, score)) in anchors.iter().enumerate() {
    data[i] = cx;
    data[n + i] = cy;
    data[2 * n + i] = w;
    data[3 * n + i] = h;
    if 4 + class_id < rows {
      data[(4 + class_id) * n + i] = score;
    }
  }
  RawOutput::from_shape_vec(&[1, rows, n], data).unwrap()
}

struct MockModel {
  rows: usize,
  anchors: Vec<Anchor>,
  kind: InputKind,
  seen: Vec<(InputKind, [usize; 4])>,
}

impl MockModel {
  fn new(anchors: Vec<Anchor>) -> Self {
    Self {
      rows: 4 + TILE_CLASS_NUM,
      anchors,
      kind: InputKind::Float32,
      seen: Vec::new(),
    }
  }
}

impl Model for MockModel {
  type Error = Infallible;

  fn input_kind(&self) -> InputKind {
    self.kind
  }

  fn infer(&mut self, input: &ModelInput<TARGET_SIZE>) -> Result<RawOutput, Self::Error> {
    self.seen.push((input.kind(), input.shape()));
    Ok(raw_output(self.rows, &self.anchors))
  }
}

struct FailingModel;

impl Model for FailingModel {
  type Error = std::io::Error;

  fn infer(&mut self, _input: &ModelInput<TARGET_SIZE>) -> Result<RawOutput, Self::Error> {
    Err(std::io::Error::other("设备不可用"))
  }
}

fn hand_image() -> DynamicImage {
  // 320x240 信箱缩放系数为 2，上下各填充 80
  DynamicImage::ImageRgb8(RgbImage::from_fn(320, 240, |x, _| {
    Rgb([(x % 256) as u8, 90, 200])
  }))
}

fn png_bytes(image: &DynamicImage) -> Vec<u8> {
  let mut bytes = Vec::new();
  image
    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
    .unwrap();
  bytes
}

fn three_tiles() -> Vec<Anchor> {
  vec![
    (500., 320., 60., 80., 0, 0.9),
    (100., 320., 60., 80., 31, 0.8),
    (300., 320., 60., 80., 9, 0.7),
  ]
}

#[test]
fn tiles_are_read_left_to_right() {
  let mut model = MockModel::new(three_tiles());
  let tiles = detect_tiles(&mut model, png_bytes(&hand_image())).unwrap();
  assert_eq!(tiles, vec![TILE_LABELS[31], TILE_LABELS[9], TILE_LABELS[0]]);
  assert_eq!(tiles, vec!["pe", "4m", "1m"]);
  assert_eq!(model.seen, vec![(InputKind::Float32, [1, 3, 640, 640])]);
}

#[test]
fn boxes_are_mapped_to_original_pixels() {
  let mut detector = Detector::new(MockModel::new(three_tiles()));
  let result = detector.detect(hand_image()).unwrap();
  let boxes: Vec<[u32; 4]> = result.iter().map(|item| item.bbox).collect();
  // (100 - 30) / 2 = 35, (320 - 40 - 80) / 2 = 100
  assert_eq!(boxes[0], [35, 100, 65, 140]);
  assert_eq!(boxes[2], [235, 100, 265, 140]);
  assert_eq!(result.iter().next().map(|item| item.kind), Tile::from_label_id(31));
}

#[test]
fn nothing_above_threshold_gives_empty_hand() {
  let anchors = vec![(320., 320., 50., 50., 3, 0.2), (100., 320., 50., 50., 7, 0.5)];
  let mut model = MockModel::new(anchors);
  let tiles = detect_tiles(&mut model, hand_image()).unwrap();
  assert!(tiles.is_empty());
}

#[test]
fn threshold_is_configurable() {
  let anchors = vec![(320., 320., 50., 50., 3, 0.2)];
  let mut detector =
    Detector::new(MockModel::new(anchors)).with_config(PipelineConfig::default().conf_threshold(0.1));
  assert_eq!(detector.detect_tiles(hand_image()).unwrap(), vec!["2m"]);
}

#[test]
fn overlapping_duplicates_collapse() {
  let anchors = vec![
    (200., 320., 60., 80., 5, 0.6),
    (202., 320., 60., 80., 5, 0.9),
  ];
  let mut detector = Detector::new(MockModel::new(anchors));
  let result = detector.detect(hand_image()).unwrap();
  assert_eq!(result.len(), 1);
  assert_eq!(result.iter().next().map(|item| item.score), Some(0.9));
}

#[test]
fn wrong_class_count_is_a_shape_error() {
  let mut model = MockModel::new(three_tiles());
  model.rows = 84;
  let err = detect_tiles(&mut model, hand_image()).unwrap_err();
  assert!(matches!(err, DetectError::ShapeMismatch { .. }), "{err}");
}

#[test]
fn inference_failure_is_reported() {
  let err = detect_tiles(&mut FailingModel, hand_image()).unwrap_err();
  assert!(matches!(err, DetectError::Inference(_)));
}

#[test]
fn undecodable_bytes_are_rejected() {
  let mut model = MockModel::new(three_tiles());
  let err = detect_tiles(&mut model, &b"\x89PNG broken"[..]).unwrap_err();
  assert!(matches!(err, DetectError::Decode(_)));
  assert!(model.seen.is_empty());
}

#[test]
fn quantized_models_receive_raw_bytes() {
  let mut model = MockModel::new(three_tiles());
  model.kind = InputKind::UInt8;
  let mut detector = Detector::new(model);
  assert_eq!(detector.detect_tiles(hand_image()).unwrap().len(), 3);
  let model = detector.into_model();
  assert_eq!(model.seen, vec![(InputKind::UInt8, [1, 3, 640, 640])]);
}

#[derive(Default)]
struct Collect {
  results: Mutex<Vec<(String, Vec<&'static str>)>>,
}

impl Render<InputFrame, DetectResult<Tile>> for &Collect {
  type Error = Infallible;

  fn render_result(&self, frame: &InputFrame, result: &DetectResult<Tile>) -> Result<(), Self::Error> {
    self
      .results
      .lock()
      .unwrap()
      .push((frame.name.clone(), result.labels()));
    Ok(())
  }
}

fn frames(count: usize) -> Vec<Result<InputFrame, std::io::Error>> {
  (0..count)
    .map(|i| {
      Ok(InputFrame {
        name: format!("hand-{i}.png"),
        image: hand_image(),
      })
    })
    .collect()
}

#[test]
fn one_shot_renders_first_frame() {
  let collect = Collect::default();
  OneShotTask
    .run_task(
      frames(3).into_iter(),
      Detector::new(MockModel::new(three_tiles())),
      &collect,
    )
    .unwrap();
  let results = collect.results.into_inner().unwrap();
  assert_eq!(results.len(), 1);
  assert_eq!(results[0].0, "hand-0.png");
  assert_eq!(results[0].1, vec!["pe", "4m", "1m"]);
}

#[test]
fn parallel_workers_own_their_detectors() {
  let built = AtomicUsize::new(0);
  let collect = Collect::default();
  let factory = || -> anyhow::Result<Detector<MockModel>> {
    built.fetch_add(1, Ordering::SeqCst);
    Ok(Detector::new(MockModel::new(three_tiles())))
  };

  ParallelTask::new(3)
    .run_task(frames(7).into_iter(), factory, &collect)
    .unwrap();

  assert_eq!(built.load(Ordering::SeqCst), 3);
  let mut results = collect.results.into_inner().unwrap();
  results.sort();
  assert_eq!(results.len(), 7);
  assert!(results.iter().all(|(_, tiles)| tiles == &vec!["pe", "4m", "1m"]));
  assert_eq!(results[0].0, "hand-0.png");
}

#[test]
fn parallel_stops_on_worker_failure() {
  let collect = Collect::default();
  let factory = || -> anyhow::Result<Detector<FailingModel>> { Ok(Detector::new(FailingModel)) };
  let err = ParallelTask::new(2)
    .run_task(frames(4).into_iter(), factory, &collect)
    .unwrap_err();
  assert!(format!("{err:#}").contains("检测失败"));
  assert!(collect.results.into_inner().unwrap().is_empty());
}

struct SlowLoad<'a> {
  index: usize,
  loading: &'a AtomicUsize,
  peak: &'a AtomicUsize,
}

impl LoadFrame for SlowLoad<'_> {
  type Error = std::io::Error;

  fn load(self) -> Result<InputFrame, Self::Error> {
    let now = self.loading.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    self.loading.fetch_sub(1, Ordering::SeqCst);
    Ok(InputFrame {
      name: format!("hand-{}.png", self.index),
      image: hand_image(),
    })
  }
}

#[test]
fn parallel_workers_load_frames_concurrently() {
  let (loading, peak) = (AtomicUsize::new(0), AtomicUsize::new(0));
  let collect = Collect::default();
  let input: Vec<SlowLoad> = (0..4)
    .map(|index| SlowLoad {
      index,
      loading: &loading,
      peak: &peak,
    })
    .collect();
  let factory = || -> anyhow::Result<Detector<MockModel>> { Ok(Detector::new(MockModel::new(three_tiles()))) };

  ParallelTask::new(2)
    .run_task(input.into_iter(), factory, &collect)
    .unwrap();

  assert_eq!(collect.results.into_inner().unwrap().len(), 4);
  assert_eq!(peak.load(Ordering::SeqCst), 2);
}
