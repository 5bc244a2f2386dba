//! Animation and line input sharing one terminal.

use std::time::Duration;

use moire_core::{
    text::count_newlines, AnimationConfig, AnimationSession, MemoryDisplay, MoireError,
    SceneComposer, SineConfig, Terminal, TokioClock, VirtualClock,
};

fn quiet_config() -> AnimationConfig {
    AnimationConfig {
        seed: Some(99),
        density: 0.0,
        sine: SineConfig {
            enabled: false,
            ..SineConfig::default()
        },
        ..AnimationConfig::default()
    }
}

#[tokio::test]
async fn input_lines_interleave_with_animation_frames() {
    let (terminal, keys) = Terminal::with_input(MemoryDisplay::new(), None).unwrap();
    let mut session =
        AnimationSession::new(SceneComposer::new(quiet_config(), 6), terminal.clone());
    let stop = session.handle();
    let clock = VirtualClock::new();
    let ticks = clock.clone();

    let animation = tokio::spawn(async move { session.run(&clock).await });

    let reader = terminal.clone();
    let line = tokio::spawn(async move { reader.request_line().await });
    while keys.is_locked().unwrap() {
        tokio::task::yield_now().await;
    }
    while ticks.sleeps() < 2 {
        tokio::task::yield_now().await;
    }
    keys.set_value("hello").unwrap();
    keys.submit().unwrap();

    assert_eq!(line.await.unwrap().unwrap(), "hello");
    stop.stop();
    let summary = animation.await.unwrap().unwrap();

    let content = terminal.content().unwrap();
    assert!(content.lines().any(|l| l == "hello"));
    assert_eq!(
        content.lines().filter(|l| *l == "      ").count() as u64,
        summary.frames
    );
    assert_eq!(count_newlines(&content) as u64, summary.frames + 1);
}

#[tokio::test]
async fn closed_input_fails_the_pending_request() {
    let (terminal, keys) = Terminal::with_input(MemoryDisplay::new(), None).unwrap();

    let reader = terminal.clone();
    let pending = tokio::spawn(async move { reader.request_line().await });
    while keys.is_locked().unwrap() {
        tokio::task::yield_now().await;
    }
    keys.close().unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, MoireError::InputClosed));
    assert_eq!(terminal.content().unwrap(), "");
}

#[tokio::test(start_paused = true)]
async fn real_clock_paces_frames() {
    let terminal = Terminal::new(moire_core::TextBuffer::with_display(
        MemoryDisplay::new(),
        None,
    ));
    let mut session =
        AnimationSession::new(SceneComposer::new(quiet_config(), 4), terminal).with_frame_limit(5);

    let start = tokio::time::Instant::now();
    let summary = session.run(&TokioClock).await.unwrap();

    assert_eq!(summary.frames, 5);
    assert!(start.elapsed() >= Duration::from_millis(5 * 40));
}
