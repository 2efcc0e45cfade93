//! Greeting animation: a word typed out, held, erased, repeated.
//!
//! The sequence is a plain frame generator so it can be restarted at any
//! point; [`Typewriter::play`] drives it on the current task and stops as soon
//! as the cancel channel fires.

use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub type_delay: Duration,
    pub hold: Duration,
    pub delete_delay: Duration,
    pub pause: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            type_delay: Duration::from_millis(200),
            hold: Duration::from_millis(1000),
            delete_delay: Duration::from_millis(100),
            pause: Duration::from_millis(500),
        }
    }
}

/// Text to display and how long to display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub text: String,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Typing,
    Holding,
    Deleting,
    Pausing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Typewriter {
    word: Vec<char>,
    timing: Timing,
    phase: Phase,
    index: usize,
    cycles: usize,
}

impl Typewriter {
    #[must_use]
    pub fn new(word: &str) -> Self {
        Self {
            word: word.chars().collect(),
            timing: Timing::default(),
            phase: Phase::Typing,
            index: 0,
            cycles: 0,
        }
    }

    #[must_use]
    pub const fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Rewind to the empty first frame.
    pub const fn reset(&mut self) {
        self.phase = Phase::Typing;
        self.index = 0;
        self.cycles = 0;
    }

    /// Number of full type/erase cycles produced so far.
    #[must_use]
    pub const fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn next_frame(&mut self) -> Frame {
        let len = self.word.len();
        let shown = self.index;
        let delay = match self.phase {
            Phase::Typing => {
                if self.index >= len {
                    self.phase = Phase::Holding;
                } else {
                    self.index += 1;
                }
                self.timing.type_delay
            }
            Phase::Holding => {
                self.phase = Phase::Deleting;
                self.index = len.saturating_sub(1);
                self.timing.hold
            }
            Phase::Deleting => {
                if self.index == 0 {
                    self.phase = Phase::Pausing;
                } else {
                    self.index -= 1;
                }
                self.timing.delete_delay
            }
            Phase::Pausing => {
                self.phase = Phase::Typing;
                self.index = 0;
                self.cycles += 1;
                self.timing.pause
            }
        };

        Frame {
            text: self.word[..shown].iter().collect(),
            delay,
        }
    }

    /// Emit frames until `cycles` more full cycles have played or `cancel`
    /// becomes `true`. A dropped sender also cancels.
    pub async fn play<F>(
        &mut self,
        cycles: usize,
        mut on_frame: F,
        mut cancel: watch::Receiver<bool>,
    ) -> PlayOutcome
    where
        F: FnMut(&str),
    {
        let target = self.cycles + cycles;
        while self.cycles < target {
            if *cancel.borrow() {
                return PlayOutcome::Cancelled;
            }
            let frame = self.next_frame();
            on_frame(&frame.text);

            tokio::select! {
                () = tokio::time::sleep(frame.delay) => {}
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        return PlayOutcome::Cancelled;
                    }
                }
            }
        }
        PlayOutcome::Completed
    }
}
