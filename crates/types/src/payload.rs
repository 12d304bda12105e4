//! Scoped streams over in-memory byte buffers.
//!
//! Every `bytes` parameter travels inside a request as a [`PayloadStream`].
//! Streams are opened through a [`PayloadLedger`], which counts the streams
//! that are still alive; dropping a stream releases it. Callers that own the
//! ledger can assert that no stream outlives the call that used it.

use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

#[derive(Debug, Default)]
struct LedgerCounts {
    live: AtomicUsize,
    opened: AtomicUsize,
}

/// Shared counter of open payload streams.
#[derive(Debug, Clone, Default)]
pub struct PayloadLedger {
    counts: Arc<LedgerCounts>,
}

impl PayloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stream over `bytes`.
    pub fn open(&self, bytes: Vec<u8>) -> PayloadStream {
        self.counts.opened.fetch_add(1, Ordering::SeqCst);
        self.counts.live.fetch_add(1, Ordering::SeqCst);
        PayloadStream {
            reader: Cursor::new(bytes),
            counts: Arc::clone(&self.counts),
        }
    }

    /// Number of streams opened through this ledger and not yet released.
    pub fn live(&self) -> usize {
        self.counts.live.load(Ordering::SeqCst)
    }

    /// Number of streams ever opened through this ledger.
    pub fn opened(&self) -> usize {
        self.counts.opened.load(Ordering::SeqCst)
    }
}

/// Read-only stream over a byte buffer, released on drop.
pub struct PayloadStream {
    reader: Cursor<Vec<u8>>,
    counts: Arc<LedgerCounts>,
}

impl PayloadStream {
    /// The full underlying buffer, independent of the read position.
    pub fn as_bytes(&self) -> &[u8] {
        self.reader.get_ref()
    }

    pub fn len(&self) -> usize {
        self.reader.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.get_ref().is_empty()
    }

    /// Base64 text of the buffer, as sent on the JSON wire.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.as_bytes())
    }
}

impl Read for PayloadStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Clone for PayloadStream {
    fn clone(&self) -> Self {
        self.counts.opened.fetch_add(1, Ordering::SeqCst);
        self.counts.live.fetch_add(1, Ordering::SeqCst);
        Self {
            reader: Cursor::new(self.reader.get_ref().clone()),
            counts: Arc::clone(&self.counts),
        }
    }
}

impl Drop for PayloadStream {
    fn drop(&mut self) {
        self.counts.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Streams compare by content.
impl PartialEq for PayloadStream {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for PayloadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadStream")
            .field("len", &self.len())
            .field("position", &self.reader.position())
            .finish()
    }
}
