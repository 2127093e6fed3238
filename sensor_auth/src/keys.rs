//! Typed-phrase override.
//!
//! Keystrokes accumulate into a short trailing buffer; whenever the buffer
//! ends with the secret phrase (case-insensitive) the override fires.

use std::collections::VecDeque;

/// Default cap on remembered keystrokes.
pub const DEFAULT_KEY_BUFFER: usize = 20;

/// Sliding window over the most recent keystrokes.
#[derive(Clone, Debug)]
pub struct OverrideBuffer {
    secret:   Vec<char>,
    buf:      VecDeque<char>,
    capacity: usize,
}

impl OverrideBuffer {
    /// `capacity` is raised to the secret's length if smaller, otherwise the
    /// phrase could never match.
    pub fn new(secret: &str, capacity: usize) -> Self {
        let secret: Vec<char> = secret.chars().flat_map(char::to_lowercase).collect();
        let capacity = capacity.max(secret.len());
        OverrideBuffer { secret, buf: VecDeque::with_capacity(capacity + 1), capacity }
    }

    /// Record one keystroke.  Returns `true` when the buffer now ends with
    /// the secret phrase.
    pub fn push(&mut self, key: char) -> bool {
        for c in key.to_lowercase() {
            self.buf.push_back(c);
            while self.buf.len() > self.capacity {
                self.buf.pop_front();
            }
        }
        self.matches()
    }

    fn matches(&self) -> bool {
        if self.secret.is_empty() || self.buf.len() < self.secret.len() {
            return false;
        }
        let start = self.buf.len() - self.secret.len();
        self.buf.range(start..).eq(self.secret.iter())
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
