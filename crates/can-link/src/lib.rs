//! can-link: the CAN transport contract consumed by the drive controller
//!
//! This crate defines the frame and identifier types plus a minimal blocking
//! `CanLink` trait. The bus itself (bitrate setup, arbitration, scheduling,
//! interface discovery) is an external collaborator and out of scope here.
//! The default build enables a scriptable `mock` backend so the controller
//! crate compiles and tests on any host without native drivers.

mod types;
pub use types::{CanFrame, CanId, Timestamp};

mod error;
pub use error::{LinkError, Result};

mod traits;
pub use traits::CanLink;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::MockLink;
