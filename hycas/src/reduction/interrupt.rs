//! Cooperative cancellation.
//!
//! Long passes poll an [`Interrupt`] once per rule attempt. A positive poll surfaces as
//! [`CalcError::Cancelled`], which the pipeline handles by rolling back.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{CalcError, CalcResult};

pub trait Interrupt {
    /// Whether the current computation should stop.
    fn should_interrupt(&mut self) -> bool;
}

/// Never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverInterrupt;

impl Interrupt for NeverInterrupt {
    fn should_interrupt(&mut self) -> bool {
        false
    }
}

/// Interrupts once a number of polls has elapsed, then on every later poll.
#[derive(Debug, Clone, Copy)]
pub struct InterruptAfter {
    remaining: usize,
}

impl InterruptAfter {
    pub fn new(polls: usize) -> Self {
        Self { remaining: polls }
    }
}

impl Interrupt for InterruptAfter {
    fn should_interrupt(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(left) => {
                self.remaining = left;
                false
            }
            None => true,
        }
    }
}

/// A flag raised by another part of the program, typically a key press handler.
impl Interrupt for Arc<AtomicBool> {
    fn should_interrupt(&mut self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// Poll `interrupt`, turning a positive answer into [`CalcError::Cancelled`].
#[inline]
pub fn check(interrupt: &mut dyn Interrupt) -> CalcResult<()> {
    if interrupt.should_interrupt() {
        log::debug!("computation interrupted");
        Err(CalcError::Cancelled)
    } else {
        Ok(())
    }
}
