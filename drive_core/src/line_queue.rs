//! Whole-line byte queue between log producers in any context and a slow output drained
//! from the lowest priority.
use heapless::Deque;

pub struct LineQueue<const N: usize> {
    bytes: Deque<u8, N>,
    /// Lines that did not fit since the last [`LineQueue::take_dropped`]
    dropped: u32,
}

impl<const N: usize> LineQueue<N> {
    pub const fn new() -> Self {
        Self {
            bytes: Deque::new(),
            dropped: 0,
        }
    }

    /// Queue `line` followed by CR LF, or nothing at all if there is no room for it.
    pub fn push_line(&mut self, line: &[u8]) -> bool {
        if N - self.bytes.len() < line.len() + 2 {
            self.dropped = self.dropped.saturating_add(1);
            return false;
        }
        for &byte in line.iter().chain(b"\r\n") {
            // room checked above
            let _ = self.bytes.push_back(byte);
        }
        true
    }

    /// Move up to `out.len()` queued bytes into `out`.
    pub fn pop_chunk(&mut self, out: &mut [u8]) -> usize {
        let mut len = 0;
        while len < out.len() {
            match self.bytes.pop_front() {
                Some(byte) => {
                    out[len] = byte;
                    len += 1;
                }
                None => break,
            }
        }
        len
    }

    pub fn take_dropped(&mut self) -> u32 {
        core::mem::take(&mut self.dropped)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

impl<const N: usize> Default for LineQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
