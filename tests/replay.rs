// 该文件是 Zhenbiao （帧标） 项目的一部分。
// tests/replay.rs - 回放任务集成测试
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

mod common;

use assert_matches::assert_matches;

use common::{FakeSource, RecordingOutput, ScriptedOperator, Step, frames};
use zhenbiao::{
  annotation::{AnnotationRecord, parse_annotations},
  model::BBox,
  operator::InputEvent,
  output::BoxStyle,
  task::{REPLAY_OPTIONS, ReplayError, Replayer, SessionEnd},
};

use InputEvent::*;

fn records(count: usize) -> Vec<AnnotationRecord> {
  (0..count)
    .map(|i| match i % 3 {
      0 => AnnotationRecord::visible(BBox::new(i as i32 % 8, 2, 6, 6)),
      1 => AnnotationRecord::Skipped,
      _ => AnnotationRecord::Invisible,
    })
    .collect()
}

fn keys(events: &[InputEvent]) -> ScriptedOperator {
  ScriptedOperator::new(events.iter().map(|e| Step::Key(*e)).collect())
}

#[test]
fn navigation_seeks_absolutely_and_clamps_at_zero() {
  let source = FakeSource::new(frames(25));
  let seeks = source.seeks.clone();
  let replayer = Replayer::new(
    source,
    RecordingOutput::default(),
    keys(&[
      NavPrev,
      NavJumpBack,
      NavJumpForward,
      NavNext,
      NavJumpBack,
      NavJumpBack,
      Quit,
    ]),
    records(25),
  );

  assert_eq!(replayer.run().unwrap(), SessionEnd::Quit);
  assert_eq!(*seeks.borrow(), vec![0, 0, 0, 10, 11, 1, 0]);
}

#[test]
fn overlays_follow_stored_records() {
  let output = RecordingOutput::default();
  let overlays = output.overlays.clone();
  let replayer = Replayer::new(
    FakeSource::new(frames(3)),
    output,
    keys(&[NavNext, NavNext, Quit]),
    records(3),
  );
  replayer.run().unwrap();

  let overlays = overlays.borrow();
  assert_eq!(overlays.len(), 3);
  assert!(overlays.iter().all(|o| o.options == REPLAY_OPTIONS.to_vec()));
  assert_eq!(
    overlays[0].boxes,
    vec![(BBox::new(0, 2, 6, 6), BoxStyle::Annotation)]
  );
  assert_eq!(overlays[1].status.as_deref(), Some("Skipped"));
  assert_eq!(overlays[2].status.as_deref(), Some("Invisible"));
  assert_eq!(overlays[2].frame_number, 2);
}

#[test]
fn annotation_events_are_ignored_during_replay() {
  let source = FakeSource::new(frames(3));
  let seeks = source.seeks.clone();
  let replayer = Replayer::new(
    source,
    RecordingOutput::default(),
    keys(&[Label, Skip, Accept, NavNext, Quit]),
    records(3),
  );
  assert_eq!(replayer.run().unwrap(), SessionEnd::Quit);
  assert_eq!(*seeks.borrow(), vec![0, 1]);
}

#[test]
fn short_record_fails_fast() {
  let replayer = Replayer::new(
    FakeSource::new(frames(5)),
    RecordingOutput::default(),
    keys(&[NavNext, NavNext, NavNext]),
    records(2),
  );

  let error = replayer.run().unwrap_err();
  assert_matches!(
    error.downcast_ref::<ReplayError>(),
    Some(ReplayError::RecordTooShort {
      frame: 2,
      records: 2
    })
  );
}

#[test]
fn past_the_end_is_end_of_stream() {
  let replayer = Replayer::new(
    FakeSource::new(frames(3)),
    RecordingOutput::default(),
    keys(&[NavNext, NavJumpForward]),
    records(3),
  );
  assert_eq!(replayer.run().unwrap(), SessionEnd::EndOfStream);
}

#[test]
fn empty_video_ends_immediately() {
  let replayer = Replayer::new(
    FakeSource::new(Vec::new()),
    RecordingOutput::default(),
    keys(&[]),
    Vec::new(),
  );
  assert_eq!(replayer.run().unwrap(), SessionEnd::EndOfStream);
}

#[test]
fn replaying_twice_is_pixel_identical() {
  let text = "V 5 5 6 6\nS -1 -1 -1 -1\nI -1 -1 -1 -1\nV 9 8 4 4\n";
  let script = [
    NavNext,
    NavNext,
    NavPrev,
    NavJumpBack,
    NavNext,
    NavNext,
    NavNext,
    Quit,
  ];

  let run = || {
    let output = RecordingOutput::default();
    let images = output.images.clone();
    let replayer = Replayer::new(
      FakeSource::new(frames(4)),
      output,
      keys(&script),
      parse_annotations(text).unwrap(),
    );
    replayer.run().unwrap();
    images.take()
  };

  let first = run();
  let second = run();
  assert_eq!(first.len(), 8);
  assert_eq!(first, second);
}
