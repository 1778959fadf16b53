use milky_viz::exchange::{Closed, ExchangeError, FrameExchange, PublishError, DEFAULT_SLOTS};
use std::thread;
use std::time::Duration;

fn frame_of(len: usize, v: u8) -> Vec<u8> {
    vec![v; len]
}

#[test]
fn published_frame_arrives_intact() {
    let (mut tx, mut rx, _shutdown) = FrameExchange::new(16, DEFAULT_SLOTS).unwrap();
    assert_eq!(tx.publish(&frame_of(16, 7)).unwrap(), 0);
    let mut out = Vec::new();
    let info = rx.take_next_frame(&mut out).unwrap();
    assert_eq!(info.seq, 0);
    assert_eq!(out, frame_of(16, 7));
}

#[test]
fn producer_never_blocks_when_display_lags() {
    let (mut tx, _rx, _shutdown) = FrameExchange::new(8, 2).unwrap();
    assert!(tx.publish(&frame_of(8, 1)).is_ok());
    assert!(tx.publish(&frame_of(8, 2)).is_ok());
    assert_eq!(tx.publish(&frame_of(8, 3)), Err(PublishError::Full));
}

#[test]
fn wrong_sized_frames_are_rejected() {
    let (mut tx, _rx, _shutdown) = FrameExchange::new(8, 2).unwrap();
    assert_eq!(
        tx.publish(&frame_of(4, 0)),
        Err(PublishError::SizeMismatch {
            expected: 8,
            got: 4
        })
    );
}

#[test]
fn construction_errors() {
    assert!(matches!(FrameExchange::new(8, 0), Err(ExchangeError::NoSlots)));
    assert!(matches!(FrameExchange::new(0, 2), Err(ExchangeError::EmptyFrame)));
}

#[test]
fn slots_rotate() {
    let (mut tx, mut rx, _shutdown) = FrameExchange::new(4, 2).unwrap();
    let mut out = Vec::new();
    let mut slots = Vec::new();
    for i in 0..4u8 {
        tx.publish(&frame_of(4, i)).unwrap();
        slots.push(rx.take_next_frame(&mut out).unwrap().slot);
        assert_eq!(out[0], i);
    }
    assert_eq!(slots, vec![0, 1, 0, 1]);
}

#[test]
fn frames_are_consumed_once_and_in_order() {
    let (mut tx, mut rx, _shutdown) = FrameExchange::new(32, DEFAULT_SLOTS).unwrap();
    let producer = thread::spawn(move || {
        let mut sent = 0u64;
        while sent < 200 {
            match tx.publish(&frame_of(32, sent as u8)) {
                Ok(seq) => {
                    assert_eq!(seq, sent);
                    sent += 1;
                }
                Err(PublishError::Full) => thread::yield_now(),
                Err(e) => panic!("publish failed: {e}"),
            }
        }
    });

    let mut out = Vec::new();
    for expect in 0..200u64 {
        let info = rx.take_next_frame(&mut out).unwrap();
        assert_eq!(info.seq, expect);
        assert!(out.iter().all(|&b| b == expect as u8));
    }
    producer.join().unwrap();
}

#[test]
fn close_wakes_a_blocked_consumer() {
    let (_tx, mut rx, shutdown) = FrameExchange::new(8, 2).unwrap();
    let waiter = thread::spawn(move || {
        let mut out = Vec::new();
        rx.take_next_frame(&mut out)
    });
    thread::sleep(Duration::from_millis(50));
    shutdown.close();
    assert_eq!(waiter.join().unwrap(), Err(Closed));
    assert!(shutdown.is_closed());
}

#[test]
fn publish_after_close_fails() {
    let (mut tx, _rx, shutdown) = FrameExchange::new(8, 2).unwrap();
    shutdown.clone().close();
    assert!(tx.is_closed());
    assert_eq!(tx.publish(&frame_of(8, 0)), Err(PublishError::Closed));
}

#[test]
fn dropped_producer_ends_the_stream() {
    let (tx, mut rx, _shutdown) = FrameExchange::new(8, 2).unwrap();
    drop(tx);
    let mut out = Vec::new();
    assert_eq!(rx.take_next_frame(&mut out), Err(Closed));
}

#[test]
fn dropped_shutdown_handles_do_not_close() {
    let (mut tx, mut rx, shutdown) = FrameExchange::new(8, 2).unwrap();
    drop(shutdown);
    tx.publish(&frame_of(8, 5)).unwrap();
    let mut out = Vec::new();
    assert_eq!(rx.take_next_frame(&mut out).map(|i| i.seq), Ok(0));
}

#[test]
fn timed_take_returns_none_when_idle() {
    let (_tx, mut rx, _shutdown) = FrameExchange::new(8, 2).unwrap();
    let mut out = Vec::new();
    assert_eq!(
        rx.take_next_frame_timeout(&mut out, Duration::from_millis(10)),
        Ok(None)
    );
}
