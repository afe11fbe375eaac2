use crate::{CanFrame, CanId, LinkError, Result};
use std::time::{Duration, Instant};

/// A minimal blocking CAN link.
///
/// This is the whole contract the drive controller consumes: bring the bus
/// up by name, push frames out, pull frames in. Backends decide what "name"
/// means (a SocketCAN interface, a serial device path, a mock label).
pub trait CanLink {
    /// Open a CAN interface by name (e.g., "can0").
    fn open(interface: &str) -> Result<Self>
    where
        Self: Sized;

    /// Send one frame.
    fn send(&mut self, frame: &CanFrame) -> Result<()>;

    /// Receive one frame (blocking, with optional timeout in milliseconds).
    fn recv(&mut self, timeout_ms: Option<u64>) -> Result<CanFrame>;

    /// Receive the next frame carrying `id`, discarding others.
    ///
    /// The timeout bounds the whole wait, not each individual `recv`. With
    /// `None` this blocks until a matching frame arrives.
    fn recv_from(&mut self, id: CanId, timeout_ms: Option<u64>) -> Result<CanFrame> {
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        loop {
            let remaining_ms = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        return Err(LinkError::Timeout);
                    }
                    Some(d.duration_since(now).as_millis() as u64)
                }
                None => None,
            };
            let frame = self.recv(remaining_ms)?;
            if frame.id == id {
                return Ok(frame);
            }
        }
    }
}
