// 该文件是 Tehai （手牌） 项目的一部分。
// src/task.rs - 检测任务调度
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
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{error, info, warn};

use crate::{
  input::{InputFrame, LoadFrame},
  label::Tile,
  model::Model,
  output::Render,
  pipeline::Detector,
  postprocess::DetectResult,
};

pub trait Task<I, D, O>: Sized {
  type Error;
  fn run_task(self, input: I, detector: D, output: O) -> Result<(), Self::Error>;
}

fn next_frame<I, E>(input: &mut I) -> Option<InputFrame>
where
  I: Iterator<Item = Result<InputFrame, E>>,
  E: std::fmt::Display,
{
  for frame in input.by_ref() {
    match frame {
      Ok(frame) => return Some(frame),
      Err(e) => warn!("跳过无法读取的输入: {}", e),
    }
  }
  None
}

/// 只处理第一帧
pub struct OneShotTask;

impl<I, E, M, O, RE> Task<I, Detector<M>, O> for OneShotTask
where
  I: Iterator<Item = Result<InputFrame, E>>,
  E: std::error::Error + Send + Sync + 'static,
  M: Model,
  O: Render<InputFrame, DetectResult<Tile>, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut detector: Detector<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input
      .next()
      .ok_or_else(|| anyhow::anyhow!("没有输入帧"))??;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = detector
      .detect_image(&frame.image)
      .with_context(|| format!("检测失败: {}", frame.name))?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 重复检测同一帧，统计平均耗时
pub struct RepeatShotTask {
  times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { times: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_times(mut self, times: usize) -> Self {
    self.times = times.max(1);
    self
  }
}

impl<I, E, M, O, RE> Task<I, Detector<M>, O> for RepeatShotTask
where
  I: Iterator<Item = Result<InputFrame, E>>,
  E: std::error::Error + Send + Sync + 'static,
  M: Model,
  O: Render<InputFrame, DetectResult<Tile>, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut detector: Detector<M>, output: O) -> Result<(), Self::Error> {
    const WARMUP: usize = 2;

    info!("开始任务...");
    let frame = input
      .next()
      .ok_or_else(|| anyhow::anyhow!("没有输入帧"))??;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.times);
    let mut last = None;
    for i in 0..self.times {
      let now = Instant::now();
      let result = detector.detect_image(&frame.image)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if let Some(result) = last {
      output.render_result(&frame, &result)?;
    }

    let measured = if times.len() > WARMUP {
      &times[WARMUP..]
    } else {
      &times[..]
    };
    warn!(
      "平均推理时间: {:.2?}",
      measured.iter().sum::<Duration>() / measured.len() as u32
    );

    Ok(())
  }
}

/// 依次处理全部输入，收到 Ctrl-C 后退出
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

fn install_interrupt() -> anyhow::Result<Arc<AtomicBool>> {
  let interrupted = Arc::new(AtomicBool::new(false));
  let flag = interrupted.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    flag.store(true, Ordering::SeqCst);
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .context("无法设置 Ctrl-C 处理函数")?;
  Ok(interrupted)
}

impl<I, E, M, O, RE> Task<I, Detector<M>, O> for ContinuousTask
where
  I: Iterator<Item = Result<InputFrame, E>>,
  E: std::error::Error + Send + Sync + 'static,
  M: Model,
  O: Render<InputFrame, DetectResult<Tile>, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut detector: Detector<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupted = install_interrupt()?;

    let mut frame_index = 0;
    while let Some(frame) = next_frame(&mut input) {
      frame_index += 1;
      info!("处理第 {} 帧图像: {}", frame_index, frame.name);
      let now = Instant::now();
      let result = detector
        .detect_image(&frame.image)
        .with_context(|| format!("检测失败: {}", frame.name))?;
      let elapsed_a = now.elapsed();
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      info!("推理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if interrupted.load(Ordering::SeqCst) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", frame_index);
    Ok(())
  }
}

/// 多个工作线程并行处理输入。
///
/// 每个线程调用一次工厂函数，构建并独占自己的检测器；
/// 检测器不会在线程之间共享。输入锁只用于取出下一项，
/// 图像的读取与解码（`LoadFrame::load`）在各线程中进行。
pub struct ParallelTask {
  workers: usize,
}

impl ParallelTask {
  pub fn new(workers: usize) -> Self {
    Self {
      workers: workers.max(1),
    }
  }
}

impl<I, P, F, M, O, RE> Task<I, F, O> for ParallelTask
where
  I: Iterator<Item = P> + Send,
  P: LoadFrame,
  F: Fn() -> anyhow::Result<Detector<M>> + Sync,
  M: Model,
  O: Render<InputFrame, DetectResult<Tile>, Error = RE> + Sync,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, factory: F, output: O) -> Result<(), Self::Error> {
    info!("开始任务, 工作线程数: {}", self.workers);
    let input = Mutex::new(input);
    let processed = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);

    let results: Vec<anyhow::Result<()>> = thread::scope(|scope| {
      let handles: Vec<_> = (0..self.workers)
        .map(|worker| {
          let (input, output, processed, failed, factory) =
            (&input, &output, &processed, &failed, &factory);
          scope.spawn(move || -> anyhow::Result<()> {
            let mut detector = factory().with_context(|| format!("工作线程 {} 构建检测器失败", worker))?;
            loop {
              if failed.load(Ordering::SeqCst) {
                return Ok(());
              }
              let pending = input
                .lock()
                .map_err(|_| anyhow::anyhow!("输入锁已损坏"))?
                .next();
              let Some(pending) = pending else {
                return Ok(());
              };
              let frame = match pending.load() {
                Ok(frame) => frame,
                Err(e) => {
                  warn!("跳过无法读取的输入: {}", e);
                  continue;
                }
              };

              let outcome = detector
                .detect_image(&frame.image)
                .with_context(|| format!("检测失败: {}", frame.name))
                .and_then(|result| {
                  output
                    .render_result(&frame, &result)
                    .map_err(anyhow::Error::from)
                });
              if let Err(e) = outcome {
                failed.store(true, Ordering::SeqCst);
                return Err(e);
              }
              processed.fetch_add(1, Ordering::SeqCst);
              info!("工作线程 {} 完成: {}", worker, frame.name);
            }
          })
        })
        .collect();

      handles
        .into_iter()
        .map(|handle| {
          handle
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("工作线程异常退出")))
        })
        .collect()
    });

    info!("任务完成，共处理 {} 帧", processed.load(Ordering::SeqCst));
    for result in results {
      if let Err(e) = result {
        error!("{:#}", e);
        return Err(e);
      }
    }
    Ok(())
  }
}
