// 该文件是 Tehai （手牌） 项目的一部分。
// src/output/print.rs - 标准输出
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

use std::convert::Infallible;

use crate::{
  FromUrl, FromUrlWithScheme, input::InputFrame, label::WithLabel, output::Render,
  postprocess::DetectResult,
};

/// 把识别到的牌按顺序打印到标准输出，`stdout:`
pub struct StdoutOutput;

impl FromUrlWithScheme for StdoutOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutOutput {
  type Error = Infallible;

  fn from_url(_url: &url::Url) -> Result<Self, Self::Error> {
    Ok(StdoutOutput)
  }
}

impl StdoutOutput {
  pub fn format_line<T: WithLabel>(name: &str, result: &DetectResult<T>) -> String {
    let tiles: Vec<String> = result
      .labels()
      .into_iter()
      .map(|label| format!("'{}'", label))
      .collect();
    format!("{}: [{}]", name, tiles.join(", "))
  }
}

impl<T: WithLabel> Render<InputFrame, DetectResult<T>> for StdoutOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &InputFrame, result: &DetectResult<T>) -> Result<(), Self::Error> {
    println!("{}", Self::format_line(&frame.name, result));
    Ok(())
  }
}
