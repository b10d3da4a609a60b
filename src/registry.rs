//! Subscription Registry - opaque handles for event handlers.
//!
//! Handlers live in a slot table. A handle is a slot index plus the slot's
//! generation at allocation time, so a handle that outlives its
//! subscription (double unregister, use after free) is detected rather than
//! silently aliasing whatever reused the slot.
//!
//! - Free slot pool for O(1) reuse
//! - Registration order kept separately; it is the dispatch order
//! - Slots whose generation would wrap are retired instead of reused
//! - Every registry has its own id; handles from another registry are unknown

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;

use crate::error::{EventError, Result};
use crate::types::{EventInfo, EventType};

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

/// Shared handler callback.
pub type Handler = Rc<dyn Fn(&EventInfo)>;

/// Opaque subscription handle.
///
/// Unique among live subscriptions; a handle is never handed out again for
/// the same slot generation, and is only valid on the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    registry: u32,
    index: u32,
    generation: u32,
}

struct Subscription {
    mask: EventType,
    handler: Handler,
    name: Option<String>,
}

struct Slot {
    generation: u32,
    entry: Option<Subscription>,
}

// =============================================================================
// Registry
// =============================================================================

/// Slot table of live subscriptions.
pub struct Registry {
    id: u32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<EventHandle>,
    capacity: Option<usize>,
    max_name_len: usize,
}

impl Registry {
    pub fn new(capacity: Option<usize>, max_name_len: usize) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            capacity,
            max_name_len,
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Add a subscription at the end of the dispatch order.
    pub fn register(&mut self, mask: EventType, handler: Handler) -> Result<EventHandle> {
        if mask.is_empty() {
            return Err(EventError::InvalidArgument("empty event mask"));
        }
        if self.capacity.is_some_and(|max| self.len() >= max) {
            return Err(EventError::ResourceExhausted);
        }

        let entry = Subscription {
            mask,
            handler,
            name: None,
        };

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                EventHandle {
                    registry: self.id,
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index =
                    u32::try_from(self.slots.len()).map_err(|_| EventError::ResourceExhausted)?;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                EventHandle {
                    registry: self.id,
                    index,
                    generation: 0,
                }
            }
        };

        self.order.push(handle);
        debug!("registered handler {:?} for {:?}", handle, mask);
        Ok(handle)
    }

    /// Remove a subscription. A second unregister of the same handle fails.
    pub fn unregister(&mut self, handle: EventHandle) -> Result<()> {
        let slot = self.live_slot_mut(handle)?;
        let entry = slot.entry.take();
        let next = slot.generation.checked_add(1);
        if let Some(next) = next {
            slot.generation = next;
        }
        match next {
            Some(_) => self.free.push(handle.index),
            // Generation space used up: retire the slot for good.
            None => debug!("retiring handler slot {}", handle.index),
        }
        self.order.retain(|h| h.index != handle.index);

        match entry.and_then(|e| e.name) {
            Some(name) => debug!("unregistered handler {:?} ({})", handle, name),
            None => debug!("unregistered handler {:?}", handle),
        }
        Ok(())
    }

    /// Attach a debug label, replacing any previous one.
    pub fn set_name(&mut self, handle: EventHandle, name: &str) -> Result<()> {
        let max = self.max_name_len;
        let slot = self.live_slot_mut(handle)?;
        if name.is_empty() {
            return Err(EventError::InvalidArgument("empty event name"));
        }
        if name.len() > max {
            return Err(EventError::InvalidArgument("event name too long"));
        }
        if let Some(entry) = slot.entry.as_mut() {
            entry.name = Some(name.to_owned());
        }
        Ok(())
    }

    /// Debug label of a live subscription.
    pub fn name(&self, handle: EventHandle) -> Result<Option<&str>> {
        self.entry(handle).map(|e| e.name.as_deref())
    }

    /// Mask of a live subscription.
    pub fn mask(&self, handle: EventHandle) -> Result<EventType> {
        self.entry(handle).map(|e| e.mask)
    }

    /// Whether the handle still refers to a live subscription.
    pub fn contains(&self, handle: EventHandle) -> bool {
        self.entry(handle).is_ok()
    }

    /// Live handles in dispatch order.
    pub fn handles(&self) -> &[EventHandle] {
        &self.order
    }

    /// Snapshot of the handlers matching `event_type`, in dispatch order.
    pub fn matching(&self, event_type: EventType) -> Vec<(EventHandle, Handler)> {
        self.order
            .iter()
            .filter_map(|&handle| {
                let entry = self.entry(handle).ok()?;
                event_type
                    .matches(entry.mask)
                    .then(|| (handle, Rc::clone(&entry.handler)))
            })
            .collect()
    }

    /// Drop every subscription. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for handle in std::mem::take(&mut self.order) {
            if let Some(slot) = self.slots.get_mut(handle.index as usize) {
                slot.entry = None;
                if let Some(next) = slot.generation.checked_add(1) {
                    slot.generation = next;
                    self.free.push(handle.index);
                }
            }
        }
    }

    fn entry(&self, handle: EventHandle) -> Result<&Subscription> {
        if handle.registry != self.id {
            return Err(EventError::NotFound);
        }
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(EventError::NotFound)
    }

    fn live_slot_mut(&mut self, handle: EventHandle) -> Result<&mut Slot> {
        if handle.registry != self.id {
            return Err(EventError::NotFound);
        }
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.entry.is_some())
            .ok_or(EventError::NotFound)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for &handle in &self.order {
            if let Ok(entry) = self.entry(handle) {
                list.entry(&format_args!(
                    "{}#{} {:?}",
                    entry.name.as_deref().unwrap_or("<unnamed>"),
                    handle.index,
                    entry.mask
                ));
            }
        }
        list.finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
