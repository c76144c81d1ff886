//! Single-flight guard: at most one run of an operation per queue.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SpoolError;

#[derive(Debug)]
pub struct FlightGuard {
    busy: AtomicBool,
    operation: &'static str,
}

impl FlightGuard {
    pub const fn new(operation: &'static str) -> Self {
        Self {
            busy: AtomicBool::new(false),
            operation,
        }
    }

    /// Claims the guard, or returns `SpoolError::Busy` while another run holds it.
    pub fn try_enter(&self) -> Result<FlightPermit<'_>, SpoolError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SpoolError::Busy {
                operation: self.operation,
            })?;
        Ok(FlightPermit { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Released on drop, including when the holding future is cancelled.
#[derive(Debug)]
pub struct FlightPermit<'a> {
    guard: &'a FlightGuard,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_entry_is_rejected_until_the_permit_drops() {
        let guard = FlightGuard::new("process_next_batch");
        let permit = guard.try_enter().unwrap();
        assert!(guard.is_busy());

        let err = guard.try_enter().unwrap_err();
        assert!(matches!(
            err,
            SpoolError::Busy {
                operation: "process_next_batch"
            }
        ));

        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_enter().is_ok());
    }
}
