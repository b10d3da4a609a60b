//! State Module - device state and the stateful input channels
//!
//! - **Device** - Modifier map, CapsLock latch, pointer position (signals)
//! - **Keyboard** - Held keys, modifier edges, repeat tracking
//! - **Pointer** - Button state machine, click and double-click detection
//! - **Classifier** - Routes ticks to channels and merges modifier state

mod classifier;
mod device;
mod keyboard;
mod pointer;

pub use classifier::*;
pub use device::*;
pub use keyboard::*;
pub use pointer::*;
