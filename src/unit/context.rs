//! The "current unit" slot of the running thread.
//!
//! Each thread has its own slot, so units running in parallel on different
//! worker threads never see each other. A unit is published only while its own
//! code runs (a Direct action, or one step of a Segmented producer) and the
//! slot is cleared before that step returns, even when it fails or panics.
//!
//! Nesting is not supported: starting a unit step while another unit is
//! published on the same thread fails with `InvalidState` rather than replacing
//! the outer unit. This includes a unit body that hands work to a thread pool
//! which then runs another unit on the waiting thread.

use super::UnitContext;
use crate::error::{Error, Result};
use crate::stream::BoundedStream;
use log::Level;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

thread_local! {
    static CURRENT: RefCell<Option<Arc<UnitContext>>> = const { RefCell::new(None) };
}

/// The unit currently running on this thread, if any.
#[must_use]
pub fn current() -> Option<Arc<UnitContext>> {
    CURRENT.with(|slot| slot.borrow().clone())
}

#[must_use]
pub fn is_active() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}

/// Call `f` with the current unit, or return `None` if no unit is running.
pub fn with_current<R>(f: impl FnOnce(&UnitContext) -> R) -> Option<R> {
    current().map(|ctx| f(&ctx))
}

/// Log through the current unit's sink. Dropped if no unit is running.
pub fn log(level: Level, message: &str) {
    with_current(|ctx| ctx.log(level, message));
}

/// Open an output file of the current unit. See [`UnitContext::open_output`].
///
/// # Errors
///
/// `InvalidState` outside a unit; storage failures otherwise.
pub fn open_output(relative: impl AsRef<Path>) -> Result<Box<dyn BoundedStream>> {
    require()?.open_output(relative)
}

/// Open the input of the current unit. See [`UnitContext::open_input`].
///
/// # Errors
///
/// `InvalidState` outside a unit; storage failures otherwise.
pub fn open_input() -> Result<Box<dyn BoundedStream>> {
    require()?.open_input()
}

fn require() -> Result<Arc<UnitContext>> {
    current().ok_or_else(|| Error::invalid_state("no processing unit is running on this thread"))
}

/// Publishes a unit for the lifetime of the guard.
pub(crate) struct ContextScope {
    // Tied to the thread whose slot it filled.
    _thread: PhantomData<*const ()>,
}

impl ContextScope {
    pub(crate) fn enter(ctx: Arc<UnitContext>) -> Result<Self> {
        CURRENT.with(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(outer) = slot.as_ref() {
                return Err(Error::invalid_state(format!(
                    "unit '{}' started while unit '{}' is running on the same thread",
                    ctx.name(),
                    outer.name()
                )));
            }
            *slot = Some(ctx);
            Ok(Self {
                _thread: PhantomData,
            })
        })
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        CURRENT.with(|slot| slot.borrow_mut().take());
    }
}
