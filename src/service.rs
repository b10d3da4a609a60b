//! Event Service - the owned context behind the public event surface.
//!
//! One service holds the subscription registry, the classifier with its
//! channel state, the device state and the time source. Nothing is global;
//! tests build as many independent services as they like (see
//! [`crate::global`] for the installed singleton).
//!
//! Samples are processed synchronously: normalize, classify, then dispatch
//! each resulting event in order. The classifier borrow is released before
//! dispatch, so handlers may call back into the service, including
//! [`EventService::submit`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::EventConfig;
use crate::dispatch::{dispatch, DispatchReport};
use crate::error::{EventError, Result};
use crate::ingest::{normalize, RawSample};
use crate::registry::{EventHandle, Handler, Registry};
use crate::state::{Classifier, DeviceState, KeyRecord};
use crate::types::{EventInfo, EventType, Modifiers, PointerButtons, Position, ScreenBounds};
use crate::REVISION;

struct Inner {
    registry: RefCell<Registry>,
    classifier: RefCell<Classifier>,
    device: DeviceState,
    clock: Box<dyn Clock>,
}

/// Input event service. Clones share the same state.
#[derive(Clone)]
pub struct EventService {
    inner: Rc<Inner>,
}

impl EventService {
    /// Service driven by the system clock.
    pub fn new(config: EventConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock::new())
    }

    /// Service driven by a caller-supplied clock.
    pub fn with_clock(config: EventConfig, clock: impl Clock + 'static) -> Result<Self> {
        config.validate()?;

        let device = DeviceState::default();
        let registry = Registry::new(config.max_handlers, config.max_name_len);
        let classifier = Classifier::new(config, device.clone());
        debug!("event service started, revision {:#x}", REVISION);

        Ok(Self {
            inner: Rc::new(Inner {
                registry: RefCell::new(registry),
                classifier: RefCell::new(classifier),
                device,
                clock: Box::new(clock),
            }),
        })
    }

    /// Interface revision.
    pub fn revision(&self) -> u32 {
        REVISION
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Subscribe `handler` to every event whose type intersects `mask`.
    pub fn register_handler<F>(&self, mask: EventType, handler: F) -> Result<EventHandle>
    where
        F: Fn(&EventInfo) + 'static,
    {
        let handler: Handler = Rc::new(handler);
        self.inner.registry.borrow_mut().register(mask, handler)
    }

    /// Subscribe with a caller context passed back on every call.
    ///
    /// The service keeps the context alive for as long as the subscription.
    pub fn register_handler_with_context<C, F>(
        &self,
        mask: EventType,
        context: Rc<C>,
        handler: F,
    ) -> Result<EventHandle>
    where
        C: ?Sized + 'static,
        F: Fn(&EventInfo, &C) + 'static,
    {
        self.register_handler(mask, move |event| handler(event, &*context))
    }

    /// Subscribe and label the subscription in one step.
    pub fn register_named_handler<F>(
        &self,
        mask: EventType,
        name: &str,
        handler: F,
    ) -> Result<EventHandle>
    where
        F: Fn(&EventInfo) + 'static,
    {
        let handle = self.register_handler(mask, handler)?;
        let mut registry = self.inner.registry.borrow_mut();
        if let Err(err) = registry.set_name(handle, name) {
            // Leave no half-made subscription behind.
            registry.unregister(handle)?;
            return Err(err);
        }
        Ok(handle)
    }

    pub fn unregister_handler(&self, handle: EventHandle) -> Result<()> {
        self.inner.registry.borrow_mut().unregister(handle)
    }

    pub fn set_event_name(&self, handle: EventHandle, name: &str) -> Result<()> {
        self.inner.registry.borrow_mut().set_name(handle, name)
    }

    pub fn event_name(&self, handle: EventHandle) -> Result<Option<String>> {
        self.inner
            .registry
            .borrow()
            .name(handle)
            .map(|name| name.map(str::to_owned))
    }

    /// Number of live subscriptions.
    pub fn handler_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    // =========================================================================
    // Device state
    // =========================================================================

    pub fn is_caps_lock_on(&self) -> bool {
        self.inner.device.is_caps_lock_on()
    }

    pub fn cursor_position(&self) -> Position {
        self.inner.device.position()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.inner.device.modifiers()
    }

    /// Reactive device state, for `effect`/`derived` consumers.
    pub fn device(&self) -> &DeviceState {
        &self.inner.device
    }

    /// Warp the pointer. No event is emitted; later events carry the new
    /// position.
    pub fn set_cursor_position(&self, position: Position) -> Result<()> {
        let screen = self.inner.classifier.borrow().config().screen;
        if let Some(screen) = screen {
            if !screen.contains(position) {
                return Err(EventError::InvalidArgument("position outside screen bounds"));
            }
        }
        self.inner.device.set_position(position);
        Ok(())
    }

    /// Change (or remove) the screen bounds; the pointer is pulled back on
    /// screen.
    pub fn set_screen_bounds(&self, screen: Option<ScreenBounds>) -> Result<()> {
        if screen.is_some_and(|s| s.width == 0 || s.height == 0) {
            return Err(EventError::InvalidArgument("screen bounds are empty"));
        }
        self.inner.classifier.borrow_mut().set_screen(screen);
        Ok(())
    }

    pub fn pressed_buttons(&self) -> PointerButtons {
        self.inner.classifier.borrow().pressed_buttons()
    }

    /// Recent key samples, oldest first.
    pub fn recent_keys(&self) -> Vec<KeyRecord> {
        self.inner.classifier.borrow().recent_keys()
    }

    /// Drop pending gesture state on both channels. Subscriptions stay.
    pub fn reset_channels(&self) {
        self.inner.classifier.borrow_mut().reset();
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Push one raw sample through the pipeline.
    ///
    /// Returns the number of events dispatched. Malformed samples are
    /// dropped with a warning and yield zero.
    pub fn submit(&self, sample: impl Into<RawSample>) -> usize {
        let Some(tick) = normalize(sample.into(), self.inner.clock.as_ref()) else {
            return 0;
        };

        let events = self.inner.classifier.borrow_mut().classify(&tick);
        for event in &events {
            let DispatchReport { failed, .. } = dispatch(&self.inner.registry, event);
            if failed > 0 {
                debug!("{} handler(s) failed on {:?}", failed, event.event_type);
            }
        }
        events.len()
    }
}

impl fmt::Debug for EventService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventService")
            .field("handlers", &self.inner.registry.borrow())
            .field("device", &self.inner.device)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
