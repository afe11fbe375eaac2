use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

#[derive(Clone)]
pub struct DriveMetrics {
    pub tx_frames: IntCounter,
    pub rx_frames: IntCounter,
    pub calibrations: IntCounter,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub drive: DriveMetrics,
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let tx_frames = IntCounter::new("drive_can_tx_frames", "Total CAN frames sent")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let rx_frames = IntCounter::new("drive_can_rx_frames", "Total CAN frames received")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let calibrations =
            IntCounter::new("drive_calibrations_total", "Completed calibration sequences")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let drive = DriveMetrics {
            tx_frames,
            rx_frames,
            calibrations,
        };
        let _ = registry.register(Box::new(drive.tx_frames.clone()));
        let _ = registry.register(Box::new(drive.rx_frames.clone()));
        let _ = registry.register(Box::new(drive.calibrations.clone()));
        Ok(Self { registry, drive })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_exposition() {
        let hub = MetricsHub::new().unwrap();
        hub.drive.tx_frames.inc();
        hub.drive.tx_frames.inc();
        hub.drive.calibrations.inc();
        let text = hub.encode_text();
        assert!(text.contains("drive_can_tx_frames 2"));
        assert!(text.contains("drive_calibrations_total 1"));
    }
}
