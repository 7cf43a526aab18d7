// 该文件是 Tehai （手牌） 项目的一部分。
// src/label.rs - 麻将牌类别标签
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

use std::fmt;

/// 模型类别数量
pub const TILE_CLASS_NUM: usize = 34;

/// 按类别编号排列的标签，顺序与模型训练时一致
pub const TILE_LABELS: [&str; TILE_CLASS_NUM] = [
  "1m", "1p", "1s", //
  "2m", "2p", "2s", //
  "3m", "3p", "3s", //
  "4m", "4p", "4s", //
  "5m", "5p", "5s", //
  "6m", "6p", "6s", //
  "7m", "7p", "7s", //
  "8m", "8p", "8s", //
  "9m", "9p", "9s", //
  "chun", "haku", "hatsu", "nan", "pe", "sha", "tou",
];

pub trait WithLabel: Sized + Copy + fmt::Debug {
  /// 标签表长度
  const LABEL_NUM: usize;

  fn to_label_str(&self) -> &'static str;
  fn to_label_id(&self) -> usize;
  fn from_label_id(id: usize) -> Option<Self>;
}

/// 麻将牌花色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
  /// 万子
  Man,
  /// 筒子
  Pin,
  /// 索子
  Sou,
}

/// 字牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Honor {
  Chun,
  Haku,
  Hatsu,
  Nan,
  Pe,
  Sha,
  Tou,
}

/// 一张麻将牌，内部保存类别编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile(u8);

impl Tile {
  /// 数牌，`rank` 取值 1..=9
  pub fn number(suit: Suit, rank: u8) -> Option<Self> {
    if !(1..=9).contains(&rank) {
      return None;
    }
    let offset = match suit {
      Suit::Man => 0,
      Suit::Pin => 1,
      Suit::Sou => 2,
    };
    Some(Tile((rank - 1) * 3 + offset))
  }

  pub fn honor(honor: Honor) -> Self {
    Tile(27 + honor as u8)
  }

  pub fn suit(&self) -> Option<Suit> {
    match self.0 {
      0..=26 => Some([Suit::Man, Suit::Pin, Suit::Sou][(self.0 % 3) as usize]),
      _ => None,
    }
  }

  pub fn rank(&self) -> Option<u8> {
    self.suit().map(|_| self.0 / 3 + 1)
  }

  pub fn is_honor(&self) -> bool {
    self.0 >= 27
  }
}

impl WithLabel for Tile {
  const LABEL_NUM: usize = TILE_CLASS_NUM;

  fn to_label_str(&self) -> &'static str {
    TILE_LABELS[self.0 as usize]
  }

  fn to_label_id(&self) -> usize {
    self.0 as usize
  }

  fn from_label_id(id: usize) -> Option<Self> {
    (id < TILE_CLASS_NUM).then_some(Tile(id as u8))
  }
}

impl fmt::Display for Tile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.to_label_str())
  }
}
