mod common;

use common::{Recorder, SocketPair, init_tracing};
use pollux::{Error, EventLoop, Interest};

use std::time::Duration;

const SHORT: Option<Duration> = Some(Duration::from_millis(100));

#[test]
fn double_remove_is_idempotent() {
    init_tracing();

    let pair = SocketPair::new();
    pair.make_left_readable();

    let event_loop = EventLoop::new();
    let recorder = Recorder::new();
    event_loop.set_listener(recorder.clone());

    event_loop
        .socket_request(None, pair.left, Interest::READ)
        .unwrap();
    let token = recorder.token_for(pair.left);

    event_loop
        .socket_request(token, pair.left, Interest::NONE)
        .unwrap();
    event_loop
        .socket_request(token, pair.left, Interest::NONE)
        .unwrap();

    event_loop.turn(SHORT).unwrap();

    assert_eq!(
        recorder.total_events(),
        0,
        "a removed watch must never reach the listener"
    );
}

#[test]
fn no_event_after_remove() {
    init_tracing();

    let pair = SocketPair::new();
    pair.make_left_readable();

    let event_loop = EventLoop::new();
    let recorder = Recorder::new();
    event_loop.set_listener(recorder.clone());

    // The descriptor is already readable when the watch is created,
    // so a readiness report is effectively queued the moment the
    // request is made. Removing before the next turn must still win.
    event_loop
        .socket_request(None, pair.left, Interest::READ)
        .unwrap();
    event_loop
        .socket_request(None, pair.left, Interest::NONE)
        .unwrap();

    for _ in 0..3 {
        event_loop.turn(SHORT).unwrap();
    }

    assert_eq!(recorder.total_events(), 0);
}

#[test]
fn remove_of_untracked_descriptor_is_ok() {
    init_tracing();

    let pair = SocketPair::new();

    let event_loop = EventLoop::new();
    let recorder = Recorder::new();
    event_loop.set_listener(recorder.clone());

    event_loop
        .socket_request(None, pair.left, Interest::NONE)
        .unwrap();
}

#[test]
fn remove_leaves_other_watches_alone() {
    init_tracing();

    let first = SocketPair::new();
    let second = SocketPair::new();
    first.make_left_readable();
    second.make_left_readable();

    let event_loop = EventLoop::new();
    let recorder = Recorder::new();
    event_loop.set_listener(recorder.clone());

    event_loop
        .socket_request(None, first.left, Interest::READ)
        .unwrap();
    event_loop
        .socket_request(None, second.left, Interest::READ)
        .unwrap();

    event_loop
        .socket_request(None, first.left, Interest::NONE)
        .unwrap();

    event_loop.turn(SHORT).unwrap();

    assert_eq!(recorder.events_for(first.left, pollux::Direction::Read), 0);
    assert_eq!(recorder.events_for(second.left, pollux::Direction::Read), 1);
}

#[test]
fn invalid_descriptor_is_rejected() {
    init_tracing();

    let event_loop = EventLoop::new();
    let recorder = Recorder::new();
    event_loop.set_listener(recorder.clone());

    let result = event_loop.socket_request(None, -1, Interest::READ);

    assert!(matches!(result, Err(Error::InvalidDescriptor(-1))));
    assert_eq!(
        recorder.tokens_for(-1),
        0,
        "a rejected descriptor must not receive a token"
    );
}

#[test]
fn watch_before_listener_is_rejected() {
    init_tracing();

    let pair = SocketPair::new();
    let event_loop = EventLoop::new();

    let result = event_loop.socket_request(None, pair.left, Interest::READ);

    assert!(matches!(result, Err(Error::ListenerMissing)));
}

// epoll rejects plain files; kqueue on macOS accepts them.
#[cfg(target_os = "linux")]
#[test]
fn os_rejected_descriptor_leaves_no_watch_behind() {
    use std::os::fd::AsRawFd;

    init_tracing();

    let file = std::fs::File::open("Cargo.toml").unwrap();
    let fd = file.as_raw_fd();

    let event_loop = EventLoop::new();
    let recorder = Recorder::new();
    event_loop.set_listener(recorder.clone());

    let result = event_loop.socket_request(None, fd, Interest::READ);

    assert!(matches!(result, Err(Error::Io(_))));
    assert_eq!(
        recorder.tokens_for(fd),
        0,
        "a rejected descriptor must not receive a token"
    );

    // The half-created watch was rolled back, so removal is a no-op
    // and a fresh request goes down the creation path again.
    event_loop.socket_request(None, fd, Interest::NONE).unwrap();
    assert!(matches!(
        event_loop.socket_request(None, fd, Interest::READ),
        Err(Error::Io(_))
    ));
}
