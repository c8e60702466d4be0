//! Callback-driven event system.
//!
//! Events are produced by:
//! - the provisioning manager's event callback (transport task)
//! - the one-shot timeout timer callback (timer task)
//!
//! and consumed by the main loop, which processes them one at a time —
//! the state machine is never reentered concurrently.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ prov mgr callback│────▶│              │     │              │
//! │ timer callback   │────▶│  Event Queue │────▶│  Main Loop   │
//! └──────────────────┘     │  (lock-free) │     │  (consumer)  │
//!                          └──────────────┘     └──────────────┘
//! ```
//!
//! Payloads (candidate SSID, failure reason) do not travel through the
//! queue; the transport adapter stashes them in its own buffers and the
//! main loop collects them when it sees the matching discriminant.

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 16;

/// System event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// The transport started serving a peer session.
    ProvStarted = 0,
    /// The peer supplied candidate credentials (payload in the
    /// transport adapter's buffer).
    ProvCredentialsReceived = 1,
    /// The candidate credentials failed (reason in the adapter).
    ProvCredentialsFailed = 2,
    /// The candidate credentials were accepted by the network.
    ProvCredentialsAccepted = 3,
    /// The provisioning session ended — always the last session event.
    ProvEnded = 4,
    /// The provisioning timeout timer fired.
    ProvTimeout = 10,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Transport/timer callbacks write (produce), main loop reads (consume).
// Uses atomic head/tail indices over a static byte buffer so the C
// callbacks can reach it without captures.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER is accessed exclusively through push_event /
// pop_event. Producer: transport/timer task context — one writer at a
// time (callbacks are serialized by their owning task). Consumer: the
// main-loop task — one reader. The acquire/release pairs on head/tail
// enforce the SPSC discipline.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue. Safe to call from callback context
/// (lock-free). Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the slot at `head` is not visible to the
    // consumer until the Release store below.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event. Called from the main loop (single consumer).
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, in FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::ProvStarted),
        1 => Some(Event::ProvCredentialsReceived),
        2 => Some(Event::ProvCredentialsFailed),
        3 => Some(Event::ProvCredentialsAccepted),
        4 => Some(Event::ProvEnded),
        10 => Some(Event::ProvTimeout),
        _ => None,
    }
}
