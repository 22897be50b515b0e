// 该文件是 Zhenbiao （帧标） 项目的一部分。
// tests/common/mod.rs - 集成测试用的替身实现
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

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::io::Write;
use std::rc::Rc;

use image::{Rgb, RgbImage};

use zhenbiao::{
  annotation::SyncWrite,
  frame::VideoFrame,
  input::FrameSource,
  model::{BBox, Candidate, PromptDetector, Tracker},
  operator::{BoxSelector, EventSource, InputEvent},
  output::{Overlay, Render, draw::Draw},
};

pub fn frames(count: usize) -> Vec<RgbImage> {
  (0..count)
    .map(|i| RgbImage::from_pixel(16, 16, Rgb([i as u8, 0, 0])))
    .collect()
}

/// 内存帧源，记录解码与定位
pub struct FakeSource {
  frames: Vec<RgbImage>,
  position: usize,
  pub decodes: Rc<Cell<usize>>,
  pub seeks: Rc<RefCell<Vec<usize>>>,
}

impl FakeSource {
  pub fn new(frames: Vec<RgbImage>) -> Self {
    Self {
      frames,
      position: 0,
      decodes: Rc::new(Cell::new(0)),
      seeks: Rc::new(RefCell::new(Vec::new())),
    }
  }
}

impl FrameSource for FakeSource {
  type Error = Infallible;

  fn next_frame(&mut self) -> Result<Option<VideoFrame>, Self::Error> {
    self.decodes.set(self.decodes.get() + 1);
    let frame = self
      .frames
      .get(self.position)
      .map(|image| VideoFrame::new(self.position, image.clone()));
    if frame.is_some() {
      self.position += 1;
    }
    Ok(frame)
  }

  fn seek(&mut self, index: usize) -> Result<Option<VideoFrame>, Self::Error> {
    self.seeks.borrow_mut().push(index);
    self.position = index;
    self.next_frame()
  }
}

/// 按脚本返回结果的跟踪器
#[derive(Default)]
pub struct FakeTracker {
  updates: VecDeque<Option<BBox>>,
  pub inits: Rc<RefCell<Vec<BBox>>>,
  pub update_calls: Rc<Cell<usize>>,
}

impl FakeTracker {
  pub fn scripted(updates: Vec<Option<BBox>>) -> Self {
    Self {
      updates: updates.into(),
      ..Default::default()
    }
  }
}

impl Tracker for FakeTracker {
  fn init(&mut self, _frame: &VideoFrame, bbox: BBox) {
    self.inits.borrow_mut().push(bbox);
  }

  fn update(&mut self, _frame: &VideoFrame) -> Option<BBox> {
    self.update_calls.set(self.update_calls.get() + 1);
    self.updates.pop_front().flatten()
  }
}

/// 按脚本返回结果的检测器，`Err` 表示检测失败
pub struct FakeDetector {
  results: RefCell<VecDeque<Result<Option<Candidate>, String>>>,
  pub calls: Rc<RefCell<Vec<(usize, String)>>>,
}

impl FakeDetector {
  pub fn scripted(results: Vec<Result<Option<Candidate>, String>>) -> Self {
    Self {
      results: RefCell::new(results.into()),
      calls: Rc::new(RefCell::new(Vec::new())),
    }
  }
}

impl PromptDetector for FakeDetector {
  type Error = String;

  fn detect(&self, frame: &VideoFrame, prompt: &str) -> Result<Option<Candidate>, Self::Error> {
    self.calls.borrow_mut().push((frame.index, prompt.to_string()));
    self.results.borrow_mut().pop_front().unwrap_or(Ok(None))
  }
}

/// 记录每次渲染的叠加层与合成画面
#[derive(Default)]
pub struct RecordingOutput {
  pub overlays: Rc<RefCell<Vec<Overlay>>>,
  pub images: Rc<RefCell<Vec<RgbImage>>>,
}

impl Render for RecordingOutput {
  type Error = Infallible;

  fn render_result(&self, frame: &VideoFrame, overlay: &Overlay) -> Result<(), Self::Error> {
    self.overlays.borrow_mut().push(overlay.clone());
    self
      .images
      .borrow_mut()
      .push(Draw::without_font().compose(&frame.image, overlay));
    Ok(())
  }
}

pub enum Step {
  Key(InputEvent),
  Draw(Option<BBox>),
}

/// 按脚本给出事件与画框结果的操作员，脚本用完后退出
pub struct ScriptedOperator {
  steps: VecDeque<Step>,
}

impl ScriptedOperator {
  pub fn new(steps: Vec<Step>) -> Self {
    Self {
      steps: steps.into(),
    }
  }
}

impl EventSource for ScriptedOperator {
  type Error = Infallible;

  fn next_event(&mut self) -> Result<InputEvent, Self::Error> {
    match self.steps.pop_front() {
      Some(Step::Key(event)) => Ok(event),
      Some(Step::Draw(_)) => panic!("expected a key, script has a box"),
      None => Ok(InputEvent::Quit),
    }
  }
}

impl BoxSelector for ScriptedOperator {
  type Error = Infallible;

  fn select_box(&mut self, _frame: &VideoFrame) -> Result<Option<BBox>, Self::Error> {
    match self.steps.pop_front() {
      Some(Step::Draw(bbox)) => Ok(bbox),
      Some(Step::Key(event)) => panic!("expected a box, script has {:?}", event),
      None => Ok(None),
    }
  }
}

/// 共享的内存缓冲区，会话结束后仍可读取内容
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
  pub fn text(&self) -> String {
    String::from_utf8(self.0.borrow().clone()).unwrap()
  }
}

impl Write for SharedBuffer {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.borrow_mut().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

impl SyncWrite for SharedBuffer {}

/// 每次写入都失败的输出，模拟磁盘已满
pub struct FailingWriter;

impl Write for FailingWriter {
  fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
    Err(std::io::Error::other("disk full"))
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

impl SyncWrite for FailingWriter {}
