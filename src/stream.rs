//! SPP transmit stream - one chunk in flight, cursor over partial writes.
//!
//! Bluedroid acknowledges SPP writes asynchronously and may accept only a
//! prefix of the buffer when the RFCOMM credit window closes. This type
//! keeps the bookkeeping out of the driver: it holds the latest sample
//! chunk, tracks how much of it was acknowledged, and answers every event
//! with the slice that must go on the wire next (if any).
//!
//! Rules, in order:
//! - the chunk always holds the newest submitted sample; a sample arriving
//!   while a write is in flight is dropped, not queued
//! - channel open transmits the buffered chunk immediately
//! - a full acknowledgement resets the cursor; the next write is the next
//!   submitted sample
//! - a partial acknowledgement advances the cursor and resends the tail
//! - congestion parks the stream until the stack signals clear

use crate::config::TX_CHUNK_MAX;
use crate::error::Error;

/// Where the stream is in its send cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum TxPhase {
    /// No SPP channel open.
    Detached,
    /// Channel open, nothing in flight.
    Ready,
    /// A write was issued and not yet fully acknowledged.
    InFlight,
    /// The stack reported congestion; resend deferred.
    Congested,
}

/// Transmit-side chunk buffer and cursor.
pub struct TxStream {
    chunk: heapless::Vec<u8, TX_CHUNK_MAX>,
    cursor: usize,
    phase: TxPhase,
}

impl TxStream {
    pub const fn new() -> Self {
        Self {
            chunk: heapless::Vec::new(),
            cursor: 0,
            phase: TxPhase::Detached,
        }
    }

    /// True when a write has been issued and not fully acknowledged.
    pub fn busy(&self) -> bool {
        matches!(self.phase, TxPhase::InFlight | TxPhase::Congested)
    }

    /// Buffer a fresh sample chunk.
    ///
    /// Returns the slice to write now when the channel is open and idle.
    /// While detached the chunk is stored so the open event can flush it;
    /// while a write is in flight the sample is dropped (telemetry is
    /// stateless, the next poll cycle brings a fresh one).
    pub fn submit(&mut self, data: &[u8]) -> Result<Option<&[u8]>, Error> {
        if data.is_empty() || data.len() > TX_CHUNK_MAX {
            return Err(Error::BufferOverflow);
        }

        match self.phase {
            TxPhase::InFlight | TxPhase::Congested => Ok(None),
            TxPhase::Detached => {
                self.replace_chunk(data);
                Ok(None)
            }
            TxPhase::Ready => {
                self.replace_chunk(data);
                self.phase = TxPhase::InFlight;
                Ok(Some(&self.chunk))
            }
        }
    }

    /// Channel opened: flush the buffered chunk immediately, if any.
    pub fn on_opened(&mut self) -> Option<&[u8]> {
        self.cursor = 0;
        if self.chunk.is_empty() {
            self.phase = TxPhase::Ready;
            None
        } else {
            self.phase = TxPhase::InFlight;
            Some(&self.chunk)
        }
    }

    /// Write acknowledged for `acked` bytes; `congested` mirrors the
    /// stack's flow-control flag. Returns the tail to resend, if any.
    pub fn on_write(&mut self, acked: usize, congested: bool) -> Option<&[u8]> {
        if self.phase != TxPhase::InFlight {
            return None;
        }

        self.cursor = (self.cursor + acked).min(self.chunk.len());

        if self.cursor >= self.chunk.len() {
            // Whole chunk on the wire: reset for the next sample.
            self.cursor = 0;
            self.phase = if congested {
                TxPhase::Congested
            } else {
                TxPhase::Ready
            };
            return None;
        }

        if congested {
            self.phase = TxPhase::Congested;
            None
        } else {
            Some(&self.chunk[self.cursor..])
        }
    }

    /// The write itself was rejected. Drop the cycle; the next sample
    /// starts a fresh one.
    pub fn on_write_failed(&mut self) {
        if self.busy() {
            self.cursor = 0;
            self.phase = TxPhase::Ready;
        }
    }

    /// Congestion state changed. When it clears with an unsent tail,
    /// returns that tail for resend.
    pub fn on_congestion(&mut self, congested: bool) -> Option<&[u8]> {
        if congested {
            if self.phase == TxPhase::InFlight {
                self.phase = TxPhase::Congested;
            }
            return None;
        }

        if self.phase != TxPhase::Congested {
            return None;
        }

        if self.cursor > 0 {
            self.phase = TxPhase::InFlight;
            Some(&self.chunk[self.cursor..])
        } else {
            self.phase = TxPhase::Ready;
            None
        }
    }

    /// Channel closed; nothing sendable until the next open.
    pub fn on_closed(&mut self) {
        self.cursor = 0;
        self.phase = TxPhase::Detached;
    }

    fn replace_chunk(&mut self, data: &[u8]) {
        self.chunk.clear();
        // Length checked in submit().
        let _ = self.chunk.extend_from_slice(data);
        self.cursor = 0;
    }
}

impl Default for TxStream {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════
