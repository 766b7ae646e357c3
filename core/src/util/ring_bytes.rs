use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Bounded byte buffer that keeps the most recent `cap` bytes of a stream.
#[derive(Clone)]
pub struct RingBytes {
    inner: Arc<Mutex<Inner>>,
    cap: usize,
}

struct Inner {
    buf: VecDeque<u8>,
    dropped: u64,
}

impl RingBytes {
    pub fn new(cap: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(Mutex::new(Inner {
                buf: VecDeque::with_capacity(cap.min(64 * 1024)),
                dropped: 0,
            })),
            cap,
        })
    }

    pub fn push(&self, data: &[u8]) {
        let mut g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if self.cap == 0 {
            g.dropped += data.len() as u64;
            return;
        }
        let data = if data.len() > self.cap {
            g.dropped += (data.len() - self.cap) as u64;
            &data[data.len() - self.cap..]
        } else {
            data
        };
        let overflow = g.buf.len().saturating_add(data.len()).saturating_sub(self.cap);
        if overflow > 0 {
            g.buf.drain(..overflow);
            g.dropped += overflow as u64;
        }
        g.buf.extend(data);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut vec = Vec::with_capacity(g.buf.len());
        vec.extend(g.buf.iter().copied());
        vec
    }

    /// Captured tail decoded as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    /// Bytes discarded from the head because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).dropped
    }
}
