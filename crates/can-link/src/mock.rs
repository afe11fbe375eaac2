use crate::{CanFrame, CanLink, LinkError, Result, Timestamp};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;
use tracing::debug;

#[derive(Default)]
struct Inner {
    rx: VecDeque<CanFrame>,
    tx: Vec<CanFrame>,
    fail_sends: bool,
}

/// In-process scriptable link.
///
/// Cloning yields another handle onto the same queues, so a test can keep a
/// handle while the controller owns the link: preload inbound frames with
/// [`push_rx`](MockLink::push_rx), then inspect everything the controller
/// transmitted with [`sent`](MockLink::sent). `recv` pops the preloaded
/// queue and reports [`LinkError::Timeout`] once it runs dry rather than
/// blocking.
#[derive(Clone)]
pub struct MockLink {
    interface: String,
    inner: Arc<Mutex<Inner>>,
}

impl MockLink {
    /// Queue a frame for the controller to receive.
    pub fn push_rx(&self, frame: CanFrame) {
        self.lock().rx.push_back(frame);
    }

    /// Everything sent over this link so far, oldest first.
    pub fn sent(&self) -> Vec<CanFrame> {
        self.lock().tx.clone()
    }

    /// Drain and return the sent-frame record.
    pub fn take_sent(&self) -> Vec<CanFrame> {
        std::mem::take(&mut self.lock().tx)
    }

    /// Make every subsequent `send` fail with an I/O error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Frames still queued for the controller to receive.
    pub fn pending_rx(&self) -> usize {
        self.lock().rx.len()
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CanLink for MockLink {
    fn open(interface: &str) -> Result<Self> {
        Ok(Self {
            interface: interface.to_string(),
            inner: Arc::new(Mutex::new(Inner::default())),
        })
    }

    fn send(&mut self, frame: &CanFrame) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_sends {
            return Err(LinkError::Io("mock send failure".to_string()));
        }
        debug!(id = %frame.id, len = frame.len, "mock send");
        inner.tx.push(frame.clone());
        Ok(())
    }

    fn recv(&mut self, _timeout_ms: Option<u64>) -> Result<CanFrame> {
        let mut frame = self.lock().rx.pop_front().ok_or(LinkError::Timeout)?;
        frame.timestamp = Some(Timestamp(OffsetDateTime::now_utc()));
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CanId;

    fn frame(id: u16, data: &[u8]) -> CanFrame {
        CanFrame::new(CanId::standard(id).unwrap(), data).unwrap()
    }

    #[test]
    fn recv_pops_preloaded_frames_in_order() {
        let mut link = MockLink::open("mock0").unwrap();
        link.push_rx(frame(0x10, &[1]));
        link.push_rx(frame(0x11, &[2]));
        assert_eq!(link.recv(None).unwrap().id.raw(), 0x10);
        assert_eq!(link.recv(None).unwrap().id.raw(), 0x11);
    }

    #[test]
    fn recv_times_out_when_queue_is_empty() {
        let mut link = MockLink::open("mock0").unwrap();
        assert!(matches!(link.recv(Some(10)), Err(LinkError::Timeout)));
    }

    #[test]
    fn clones_share_queues() {
        let mut link = MockLink::open("mock0").unwrap();
        let handle = link.clone();
        link.send(&frame(0x205, &[0x01])).unwrap();
        let sent = handle.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id.raw(), 0x205);
    }

    #[test]
    fn failed_sends_surface_io_errors() {
        let mut link = MockLink::open("mock0").unwrap();
        link.set_fail_sends(true);
        assert!(matches!(
            link.send(&frame(0x205, &[0x01])),
            Err(LinkError::Io(_))
        ));
    }

    #[test]
    fn recv_from_skips_unrelated_ids() {
        let mut link = MockLink::open("mock0").unwrap();
        link.push_rx(frame(0x99, &[0]));
        link.push_rx(frame(0x10, &[7]));
        let got = link
            .recv_from(CanId::standard(0x10).unwrap(), Some(50))
            .unwrap();
        assert_eq!(got.payload(), &[7]);
    }
}
