//! Frame handoff between the synthesis thread and the display thread.
//!
//! A fixed set of preallocated slots circulates through two bounded
//! channels: `free` holds slots the producer may fill, `ready` holds
//! published frames in order. Neither side ever allocates after setup and the
//! producer never blocks.

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError, TrySendError};
use std::collections::TryReserveError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SLOTS: usize = 2;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("frame exchange needs at least one slot")]
    NoSlots,
    #[error("frames must be non-empty")]
    EmptyFrame,
    #[error("cannot allocate {bytes}-byte frame slot")]
    Alloc {
        bytes: usize,
        #[source]
        source: TryReserveError,
    },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    #[error("no free slot: consumer has not caught up")]
    Full,
    #[error("frame exchange closed")]
    Closed,
    #[error("frame is {got} bytes, slots hold {expected}")]
    SizeMismatch { expected: usize, got: usize },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("frame exchange closed")]
pub struct Closed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Publish order, starting at 0.
    pub seq: u64,
    pub slot: usize,
}

struct Slot {
    index: usize,
    seq: u64,
    pixels: Vec<u8>,
}

struct Shared {
    closed: AtomicBool,
    frame_len: usize,
}

pub struct FrameExchange;

impl FrameExchange {
    /// Allocates `slots` frames of `frame_len` bytes up front.
    pub fn new(
        frame_len: usize,
        slots: usize,
    ) -> Result<(FrameProducer, FrameConsumer, ShutdownHandle), ExchangeError> {
        if slots == 0 {
            return Err(ExchangeError::NoSlots);
        }
        if frame_len == 0 {
            return Err(ExchangeError::EmptyFrame);
        }

        let (free_tx, free_rx) = bounded::<Slot>(slots);
        let (ready_tx, ready_rx) = bounded::<Slot>(slots);
        let (wake_tx, wake_rx) = bounded::<()>(1);

        for index in 0..slots {
            let mut pixels = Vec::new();
            pixels
                .try_reserve_exact(frame_len)
                .map_err(|source| ExchangeError::Alloc {
                    bytes: frame_len,
                    source,
                })?;
            pixels.resize(frame_len, 0);
            // Cannot fail: capacity equals the slot count.
            let _ = free_tx.try_send(Slot {
                index,
                seq: 0,
                pixels,
            });
        }

        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            frame_len,
        });
        tracing::debug!(frame_len, slots, "frame exchange ready");

        Ok((
            FrameProducer {
                shared: shared.clone(),
                free_rx,
                ready_tx,
                next_seq: 0,
            },
            FrameConsumer {
                shared: shared.clone(),
                ready_rx,
                free_tx,
                wake_rx,
                _wake_tx: wake_tx.clone(),
            },
            ShutdownHandle { shared, wake_tx },
        ))
    }
}

pub struct FrameProducer {
    shared: Arc<Shared>,
    free_rx: Receiver<Slot>,
    ready_tx: Sender<Slot>,
    next_seq: u64,
}

impl FrameProducer {
    pub fn frame_len(&self) -> usize {
        self.shared.frame_len
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Copies `pixels` into the next free slot and marks it ready.
    pub fn publish(&mut self, pixels: &[u8]) -> Result<u64, PublishError> {
        if self.is_closed() {
            return Err(PublishError::Closed);
        }
        if pixels.len() != self.shared.frame_len {
            return Err(PublishError::SizeMismatch {
                expected: self.shared.frame_len,
                got: pixels.len(),
            });
        }

        let mut slot = match self.free_rx.try_recv() {
            Ok(slot) => slot,
            Err(TryRecvError::Empty) => return Err(PublishError::Full),
            Err(TryRecvError::Disconnected) => return Err(PublishError::Closed),
        };
        slot.pixels.copy_from_slice(pixels);
        slot.seq = self.next_seq;

        match self.ready_tx.try_send(slot) {
            Ok(()) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                Ok(seq)
            }
            Err(TrySendError::Full(_)) => Err(PublishError::Full),
            Err(TrySendError::Disconnected(_)) => Err(PublishError::Closed),
        }
    }
}

pub struct FrameConsumer {
    shared: Arc<Shared>,
    ready_rx: Receiver<Slot>,
    free_tx: Sender<Slot>,
    wake_rx: Receiver<()>,
    // Keeps `wake_rx` connected after every shutdown handle is dropped.
    _wake_tx: Sender<()>,
}

impl FrameConsumer {
    pub fn frame_len(&self) -> usize {
        self.shared.frame_len
    }

    /// Blocks until a frame is ready or the exchange closes.
    pub fn take_next_frame(&mut self, out: &mut Vec<u8>) -> Result<FrameInfo, Closed> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(Closed);
        }
        select! {
            recv(self.ready_rx) -> slot => match slot {
                Ok(slot) => Ok(hand_back(&self.free_tx, slot, out)),
                Err(_) => Err(Closed),
            },
            recv(self.wake_rx) -> _ => Err(Closed),
        }
    }

    /// Like [`take_next_frame`](Self::take_next_frame) but gives up after
    /// `timeout` with `Ok(None)`.
    pub fn take_next_frame_timeout(
        &mut self,
        out: &mut Vec<u8>,
        timeout: Duration,
    ) -> Result<Option<FrameInfo>, Closed> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(Closed);
        }
        select! {
            recv(self.ready_rx) -> slot => match slot {
                Ok(slot) => Ok(Some(hand_back(&self.free_tx, slot, out))),
                Err(_) => Err(Closed),
            },
            recv(self.wake_rx) -> _ => Err(Closed),
            default(timeout) => Ok(None),
        }
    }
}

fn hand_back(free_tx: &Sender<Slot>, slot: Slot, out: &mut Vec<u8>) -> FrameInfo {
    out.clear();
    out.extend_from_slice(&slot.pixels);
    let info = FrameInfo {
        seq: slot.seq,
        slot: slot.index,
    };
    // The free channel has room for every slot; a disconnected producer
    // just lets the buffer drop.
    let _ = free_tx.try_send(slot);
    info
}

/// Cloneable close switch; wakes a consumer parked in `take_next_frame`.
#[derive(Clone)]
pub struct ShutdownHandle {
    shared: Arc<Shared>,
    wake_tx: Sender<()>,
}

impl ShutdownHandle {
    pub fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("frame exchange closing");
        }
        let _ = self.wake_tx.try_send(());
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}
