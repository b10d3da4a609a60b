//! Global Service - one installed [`EventService`] per thread.
//!
//! Firmware-side callers expect a single event protocol instance that is
//! brought up once and queried from anywhere. This module keeps that
//! instance in a thread-local slot. Every call before [`init`] or after
//! [`shutdown`] fails with [`EventError::Uninitialized`].
//!
//! The service is cloned out of the slot before each call, so handlers can
//! use these functions re-entrantly while a sample is being dispatched.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::clock::Clock;
use crate::config::EventConfig;
use crate::error::{EventError, Result};
use crate::ingest::RawSample;
use crate::registry::EventHandle;
use crate::service::EventService;
use crate::types::{EventInfo, EventType, Position};

thread_local! {
    static SERVICE: RefCell<Option<EventService>> = const { RefCell::new(None) };
}

/// The installed service.
pub fn service() -> Result<EventService> {
    SERVICE.with(|slot| slot.borrow().clone().ok_or(EventError::Uninitialized))
}

/// Install a service driven by the system clock. Returns the revision.
///
/// Replaces any previously installed service; its handles become invalid.
pub fn init(config: EventConfig) -> Result<u32> {
    install(EventService::new(config)?)
}

/// Install a service driven by `clock`. Returns the revision.
pub fn init_with_clock(config: EventConfig, clock: impl Clock + 'static) -> Result<u32> {
    install(EventService::with_clock(config, clock)?)
}

fn install(service: EventService) -> Result<u32> {
    let revision = service.revision();
    let previous = SERVICE.with(|slot| slot.borrow_mut().replace(service));
    if previous.is_some() {
        debug!("replacing installed event service");
    }
    Ok(revision)
}

/// Tear down the installed service, if any.
pub fn shutdown() {
    let previous = SERVICE.with(|slot| slot.borrow_mut().take());
    if previous.is_some() {
        debug!("event service shut down");
    }
}

pub fn is_initialized() -> bool {
    SERVICE.with(|slot| slot.borrow().is_some())
}

// =============================================================================
// Protocol surface
// =============================================================================

pub fn revision() -> Result<u32> {
    service().map(|s| s.revision())
}

pub fn register_handler<F>(mask: EventType, handler: F) -> Result<EventHandle>
where
    F: Fn(&EventInfo) + 'static,
{
    service()?.register_handler(mask, handler)
}

pub fn register_handler_with_context<C, F>(
    mask: EventType,
    context: Rc<C>,
    handler: F,
) -> Result<EventHandle>
where
    C: ?Sized + 'static,
    F: Fn(&EventInfo, &C) + 'static,
{
    service()?.register_handler_with_context(mask, context, handler)
}

pub fn unregister_handler(handle: EventHandle) -> Result<()> {
    service()?.unregister_handler(handle)
}

pub fn set_cursor_position(position: Position) -> Result<()> {
    service()?.set_cursor_position(position)
}

pub fn set_event_name(handle: EventHandle, name: &str) -> Result<()> {
    service()?.set_event_name(handle, name)
}

pub fn is_caps_lock_on() -> Result<bool> {
    service().map(|s| s.is_caps_lock_on())
}

pub fn cursor_position() -> Result<Position> {
    service().map(|s| s.cursor_position())
}

/// Push a raw sample into the installed service.
pub fn submit(sample: impl Into<RawSample>) -> Result<usize> {
    service().map(|s| s.submit(sample))
}

// =============================================================================
// TESTS
// =============================================================================
