//! odrive-axis: drive one ODrive-class motor controller over CAN
//!
//! The controller sequences the device's calibration and control state
//! machine with single-byte command frames, streams a torque setpoint, and
//! polls telemetry back as 4-byte little-endian float data frames. The CAN
//! bus itself lives behind the [`can_link::CanLink`] contract; the physical
//! device is the source of truth for all axis state.

mod protocol;
pub use protocol::{
    command_frame, command_id, data_frame, decode_axis_state, decode_f32, state_id, telemetry_id,
    AxisState, Command, ControlMode, DeviceId, Parameter, AXIS_STATE_BASE, CONTROL_MODE_BASE,
};

mod error;
pub use error::{DriveError, Result};

mod config;
pub use config::{load_config_file, DriveConfig, FilterConfig};

mod controller;
pub use controller::{CancelToken, DriveController};

mod filter;
pub use filter::LowPassFilter;

mod pair;
pub use pair::DrivePair;

mod metrics;
pub use metrics::{DriveMetrics, MetricsHub};
