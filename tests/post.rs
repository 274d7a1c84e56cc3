mod common;

use common::{Recorder, init_tracing};
use pollux::EventLoop;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const SHORT: Option<Duration> = Some(Duration::from_millis(100));

#[test]
fn posted_tasks_run_in_fifo_order() {
    init_tracing();

    let event_loop = EventLoop::new();
    let recorder = Recorder::new();
    event_loop.set_listener(recorder);

    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let order = order.clone();
        event_loop.post(move || order.lock().unwrap().push(i));
    }

    event_loop.turn(SHORT).unwrap();

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn task_posted_from_a_task_runs_on_the_next_turn() {
    init_tracing();

    let event_loop = EventLoop::new();
    let ran = Arc::new(AtomicUsize::new(0));

    {
        let ran = ran.clone();
        let handle = event_loop.handle();
        event_loop.post(move || {
            ran.fetch_add(1, Ordering::SeqCst);

            let ran = ran.clone();
            handle.post(move || {
                ran.fetch_add(10, Ordering::SeqCst);
            });
        });
    }

    event_loop.turn(SHORT).unwrap();
    assert_eq!(
        ran.load(Ordering::SeqCst),
        1,
        "the drain operates on a snapshot; the inner task waits for the next turn"
    );

    event_loop.turn(SHORT).unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 11);
}

#[test]
fn cross_thread_post_wakes_a_blocked_poll() {
    init_tracing();

    let event_loop = EventLoop::new();
    let handle = event_loop.handle();
    let ran = Arc::new(AtomicUsize::new(0));

    let poster = {
        let ran = ran.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.post(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        })
    };

    let start = Instant::now();
    // Nothing is watched and no timer is pending, so only the posted
    // task can wake this turn.
    event_loop.turn(None).unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() >= Duration::from_millis(50));

    poster.join().unwrap();
}

#[test]
fn shutdown_stops_a_running_loop() {
    init_tracing();

    let (handle_tx, handle_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel();

    let runner = thread::spawn(move || {
        let event_loop = EventLoop::new();
        handle_tx.send(event_loop.handle()).unwrap();
        event_loop.run().unwrap();
    });

    let handle = handle_rx.recv().unwrap();

    handle.post(move || {
        done_tx.send(()).unwrap();
    });

    done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("posted task never ran");

    handle.shutdown();
    runner.join().unwrap();
}
