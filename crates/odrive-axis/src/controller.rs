//! Drive controller: calibration sequencing, torque streaming, telemetry.
//!
//! One controller owns one link handle and speaks to one drive. The model is
//! single-threaded and blocking: every operation runs to completion or
//! returns a typed error, and the only suspension point is the poll-interval
//! sleep inside [`DriveController::wait_for_idle`]. A controller is not safe
//! for concurrent calls; when several controllers share one physical bus the
//! caller must serialize access externally.
//!
//! The physical device is the source of truth for the axis state machine:
//! the controller never trusts a locally cached state for sequencing, it
//! polls the device. A best-effort shadow of the last observed state is kept
//! for diagnostics only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use can_link::{CanLink, LinkError};
use tracing::{debug, info, warn};

use crate::config::DriveConfig;
use crate::error::{DriveError, Result};
use crate::filter::LowPassFilter;
use crate::metrics::DriveMetrics;
use crate::protocol::{self, AxisState, Command, ControlMode, DeviceId, Parameter};

/// Cooperative cancellation for the blocking waits.
///
/// Clone the token, hand one clone to another thread, and `cancel()` there
/// to abort a wait in progress.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Controller for a single ODrive-class drive on a CAN bus.
pub struct DriveController<L: CanLink> {
    device: DeviceId,
    config: DriveConfig,
    link: Option<L>,
    last_observed_state: Option<AxisState>,
    metrics: Option<DriveMetrics>,
    iq_filter: LowPassFilter,
    torque_filter: LowPassFilter,
    vel_filter: LowPassFilter,
    pos_filter: LowPassFilter,
}

impl<L: CanLink> DriveController<L> {
    /// Create a controller that will open its own link on `initialize`.
    pub fn new(device: DeviceId, config: DriveConfig) -> Result<Self> {
        Self::build(device, None, config)
    }

    /// Create a controller over an already-open link.
    ///
    /// Used when the caller manages the link lifetime itself (shared-bus
    /// setups, tests against a mock).
    pub fn attach(device: DeviceId, link: L, config: DriveConfig) -> Result<Self> {
        Self::build(device, Some(link), config)
    }

    fn build(device: DeviceId, link: Option<L>, config: DriveConfig) -> Result<Self> {
        let (cutoff_hz, sample_hz) = (config.filter.cutoff_hz, config.filter.sample_hz);
        Ok(Self {
            device,
            link,
            last_observed_state: None,
            metrics: None,
            iq_filter: LowPassFilter::new(cutoff_hz, sample_hz)?,
            torque_filter: LowPassFilter::new(cutoff_hz, sample_hz)?,
            vel_filter: LowPassFilter::new(cutoff_hz, sample_hz)?,
            pos_filter: LowPassFilter::new(cutoff_hz, sample_hz)?,
            config,
        })
    }

    /// Attach Prometheus counters for frames and calibrations.
    pub fn set_metrics(&mut self, metrics: DriveMetrics) {
        self.metrics = Some(metrics);
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Last axis state seen by any telemetry poll. Best-effort diagnostic
    /// only; the device remains the source of truth.
    pub fn last_observed_state(&self) -> Option<AxisState> {
        self.last_observed_state
    }

    /// Open the CAN link on the configured interface.
    ///
    /// Must be called once before any operation that touches the bus. An
    /// unusable bus is reported to the caller, never treated as fatal here.
    pub fn initialize(&mut self) -> Result<()> {
        if self.link.is_some() {
            warn!(interface = %self.config.interface, "link already open, skipping initialize");
            return Ok(());
        }
        info!(interface = %self.config.interface, "opening CAN link");
        let link = L::open(&self.config.interface).map_err(|source| DriveError::Open {
            interface: self.config.interface.clone(),
            source,
        })?;
        self.link = Some(link);
        info!(device = self.device.raw(), "CAN link ready");
        Ok(())
    }

    /// Run the full calibration sequence: motor calibration, wait for idle,
    /// encoder offset calibration, wait for idle.
    pub fn calibrate(&mut self, cancel: &CancelToken) -> Result<()> {
        info!(device = self.device.raw(), "starting calibration");
        self.send_command(Command::RequestState(AxisState::MotorCalibration))?;
        self.wait_for_idle(cancel)?;
        self.send_command(Command::RequestState(AxisState::EncoderOffsetCalibration))?;
        self.wait_for_idle(cancel)?;
        if let Some(metrics) = &self.metrics {
            metrics.calibrations.inc();
        }
        info!(device = self.device.raw(), "calibration complete");
        Ok(())
    }

    /// Poll the axis state until the drive reports idle.
    ///
    /// Polls immediately, so a drive that is already idle returns without
    /// sleeping. A missing state report counts as "not idle yet" and polling
    /// continues; any other telemetry failure aborts the wait. The
    /// configured calibration timeout bounds the whole wait (`0` waits
    /// forever, the legacy behavior).
    pub fn wait_for_idle(&mut self, cancel: &CancelToken) -> Result<()> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let start = Instant::now();
        let deadline = match self.config.calibration_timeout_ms {
            0 => None,
            ms => Some(start + Duration::from_millis(ms)),
        };

        loop {
            if cancel.is_cancelled() {
                return Err(DriveError::Cancelled);
            }
            match self.axis_state() {
                Ok(AxisState::Idle) => return Ok(()),
                Ok(state) => debug!(?state, "axis not idle yet"),
                Err(DriveError::Telemetry {
                    source: LinkError::Timeout,
                    ..
                }) => debug!("no axis state report yet"),
                Err(e) => return Err(e),
            }
            let now = Instant::now();
            let nap = match deadline {
                Some(deadline) => {
                    if now >= deadline {
                        return Err(DriveError::CalibrationTimeout {
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    poll.min(deadline.duration_since(now))
                }
                None => poll,
            };
            thread::sleep(nap);
        }
    }

    /// Put the drive in torque control: control-mode command, then request
    /// closed-loop control.
    pub fn set_torque_control_mode(&mut self) -> Result<()> {
        self.send_command(Command::SetControlMode(ControlMode::TorqueControl))?;
        self.send_command(Command::RequestState(AxisState::ClosedLoopControl))?;
        info!(device = self.device.raw(), "torque control mode active");
        Ok(())
    }

    /// Stop the drive: zero the torque setpoint, then request idle.
    pub fn stop(&mut self) -> Result<()> {
        self.send_data(Parameter::InputTorque, 0.0)?;
        self.send_command(Command::RequestState(AxisState::Idle))?;
        info!(device = self.device.raw(), "drive stopped");
        Ok(())
    }

    /// Stream a torque setpoint in Nm.
    ///
    /// Non-finite values are always rejected; when a torque limit is
    /// configured, setpoints beyond it are rejected too.
    pub fn set_input_torque(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(DriveError::NonFiniteTorque(value));
        }
        if let Some(limit_nm) = self.config.torque_limit_nm {
            if value.abs() > limit_nm {
                return Err(DriveError::TorqueOutOfRange { value, limit_nm });
            }
        }
        self.send_data(Parameter::InputTorque, value)
    }

    /// Read the axis state reported by the drive.
    pub fn axis_state(&mut self) -> Result<AxisState> {
        let id = protocol::state_id(self.device)?;
        let timeout = self.config.recv_timeout_ms;
        let link = self.link.as_mut().ok_or(DriveError::NotInitialized)?;
        let frame = link
            .recv_from(id, Some(timeout))
            .map_err(|source| DriveError::Telemetry {
                parameter: "axis_state",
                source,
            })?;
        if let Some(metrics) = &self.metrics {
            metrics.rx_frames.inc();
        }
        let state = protocol::decode_axis_state(&frame)?;
        self.last_observed_state = Some(state);
        Ok(state)
    }

    pub fn torque_constant(&mut self) -> Result<f32> {
        self.read_parameter(Parameter::TorqueConstant)
    }

    pub fn iq_measured(&mut self) -> Result<f32> {
        self.read_parameter(Parameter::IqMeasured)
    }

    pub fn torque_estimate(&mut self) -> Result<f32> {
        self.read_parameter(Parameter::TorqueEstimate)
    }

    pub fn vel_estimate(&mut self) -> Result<f32> {
        self.read_parameter(Parameter::VelEstimate)
    }

    pub fn pos_estimate(&mut self) -> Result<f32> {
        self.read_parameter(Parameter::PosEstimate)
    }

    /// Filtered variants of the telemetry reads. Each call feeds the raw
    /// sample through this channel's low-pass filter, so call at a steady
    /// rate matching the configured sample frequency.
    pub fn iq_measured_filtered(&mut self) -> Result<f32> {
        let raw = self.iq_measured()?;
        Ok(self.iq_filter.apply(raw))
    }

    pub fn torque_estimate_filtered(&mut self) -> Result<f32> {
        let raw = self.torque_estimate()?;
        Ok(self.torque_filter.apply(raw))
    }

    pub fn vel_estimate_filtered(&mut self) -> Result<f32> {
        let raw = self.vel_estimate()?;
        Ok(self.vel_filter.apply(raw))
    }

    pub fn pos_estimate_filtered(&mut self) -> Result<f32> {
        let raw = self.pos_estimate()?;
        Ok(self.pos_filter.apply(raw))
    }

    /// Estimate the torque applied externally to the axis: filtered torque
    /// estimate minus the torque we are commanding ourselves.
    pub fn external_torque(&mut self, input_torque: f32) -> Result<f32> {
        Ok(self.torque_estimate_filtered()? - input_torque)
    }

    /// Clear the filtered-telemetry state, e.g. after a mode change.
    pub fn reset_filters(&mut self) {
        self.iq_filter.reset();
        self.torque_filter.reset();
        self.vel_filter.reset();
        self.pos_filter.reset();
    }

    fn send_command(&mut self, command: Command) -> Result<()> {
        let frame = protocol::command_frame(self.device, command)?;
        debug!(device = self.device.raw(), ?command, "sending command");
        let link = self.link.as_mut().ok_or(DriveError::NotInitialized)?;
        link.send(&frame).map_err(DriveError::Send)?;
        if let Some(metrics) = &self.metrics {
            metrics.tx_frames.inc();
        }
        Ok(())
    }

    fn send_data(&mut self, parameter: Parameter, value: f32) -> Result<()> {
        let frame = protocol::data_frame(self.device, parameter, value)?;
        let link = self.link.as_mut().ok_or(DriveError::NotInitialized)?;
        link.send(&frame).map_err(DriveError::Send)?;
        if let Some(metrics) = &self.metrics {
            metrics.tx_frames.inc();
        }
        Ok(())
    }

    fn read_parameter(&mut self, parameter: Parameter) -> Result<f32> {
        let id = protocol::telemetry_id(self.device, parameter)?;
        let timeout = self.config.recv_timeout_ms;
        let link = self.link.as_mut().ok_or(DriveError::NotInitialized)?;
        let frame = link
            .recv_from(id, Some(timeout))
            .map_err(|source| DriveError::Telemetry {
                parameter: parameter.name(),
                source,
            })?;
        if let Some(metrics) = &self.metrics {
            metrics.rx_frames.inc();
        }
        protocol::decode_f32(&frame)
    }
}
