// 该文件是 Tehai （手牌） 项目的一部分。
// src/main.rs - 手牌识别命令行程序
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

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use url::Url;

use tehai::{
  Detector, FromUrl, PipelineConfig,
  input::InputWrapper,
  model::OnnxModelBuilder,
  output::OutputWrapper,
  task::{ContinuousTask, OneShotTask, ParallelTask, RepeatShotTask, Task},
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TaskKind {
  /// 只处理第一张图像
  Oneshot,
  /// 重复处理第一张图像并统计耗时
  Repeat,
  /// 依次处理全部输入
  Continuous,
  /// 多线程处理全部输入
  Parallel,
}

/// Tehai 手牌识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 onnx:///models/tehai.onnx?threads=2
  #[arg(long, value_name = "MODEL")]
  model: Url,
  /// 输入来源，image:///path/hand.png 或 folder:///path/dir
  #[arg(long, value_name = "SOURCE")]
  input: Url,
  /// 输出路径，stdout:、json://、image:// 或 folder://
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.5, value_name = "THRESHOLD")]
  confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.5, value_name = "THRESHOLD")]
  iou: f32,

  #[arg(long, value_enum, default_value_t = TaskKind::Continuous)]
  task: TaskKind,
  /// parallel 任务的工作线程数
  #[arg(long, default_value_t = 2, value_name = "WORKERS")]
  workers: usize,
  /// repeat 任务的重复次数
  #[arg(long, default_value_t = 100, value_name = "TIMES")]
  times: usize,
  /// continuous 任务最多处理的帧数
  #[arg(long, value_name = "FRAMES")]
  frames: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let config = PipelineConfig::default()
    .conf_threshold(args.confidence)
    .iou_threshold(args.iou);
  info!(
    "置信度阈值: {}, NMS 阈值: {}",
    config.conf_threshold, config.iou_threshold
  );

  let input = InputWrapper::from_url(&args.input)?;
  let builder = OnnxModelBuilder::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  match args.task {
    TaskKind::Oneshot => {
      let detector = Detector::new(builder.build()?).with_config(config);
      OneShotTask.run_task(input, detector, output)?;
    }
    TaskKind::Repeat => {
      let detector = Detector::new(builder.build()?).with_config(config);
      RepeatShotTask::default()
        .with_times(args.times)
        .run_task(input, detector, output)?;
    }
    TaskKind::Continuous => {
      let detector = Detector::new(builder.build()?).with_config(config);
      ContinuousTask::default()
        .with_frame_number(args.frames)
        .run_task(input, detector, output)?;
    }
    TaskKind::Parallel => {
      let factory = || -> Result<_> { Ok(Detector::new(builder.build()?).with_config(config)) };
      ParallelTask::new(args.workers).run_task(input.into_pending(), factory, output)?;
    }
  }

  Ok(())
}
