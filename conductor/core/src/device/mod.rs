//! Device Notification
//!
//! Mirrors the pet's mood onto an external actuator (a small display board
//! listening on the local network). Delivery is best-effort: signals are
//! queued in emission order, sent once, and failures are logged and dropped.
//!
//! # Available Links
//!
//! - **UDP**: one datagram per signal, straight to the board
//! - **HTTP relay**: `POST /api/esp32` on the pet backend, which forwards it
//! - **Disabled**: signals are logged and discarded
//!
//! # Usage
//!
//! ```ignore
//! use tomo_conductor::device::{DeviceNotifier, NotifierConfig, UdpLink};
//!
//! let link = UdpLink::new("10.87.41.107", 5005);
//! let notifier = DeviceNotifier::new(Arc::new(link), NotifierConfig::default());
//! notifier.start_heartbeat(machine.subscribe(), machine.table());
//! ```

mod link;
mod notifier;

pub use link::{DeviceError, DeviceLink, DisabledLink, HttpRelayLink, UdpLink};
pub use notifier::{DeviceNotifier, NotifierConfig, SignalSink};
