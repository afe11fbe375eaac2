use can_link::LinkError;
use thiserror::Error;

pub type Result<T, E = DriveError> = core::result::Result<T, E>;

/// Everything a drive operation can report back to the caller.
///
/// The controller never terminates the process and never swallows a failure:
/// each public operation returns one of these and the caller decides whether
/// it is fatal to the program.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("failed to open CAN interface {interface}")]
    Open {
        interface: String,
        #[source]
        source: LinkError,
    },
    #[error("failed to send command frame")]
    Send(#[source] LinkError),
    #[error("telemetry read failed for {parameter}")]
    Telemetry {
        parameter: &'static str,
        #[source]
        source: LinkError,
    },
    #[error("calibration wait exceeded {waited_ms} ms without reaching idle")]
    CalibrationTimeout { waited_ms: u64 },
    #[error("operation cancelled")]
    Cancelled,
    #[error("input torque {value} outside configured limit of +/-{limit_nm} Nm")]
    TorqueOutOfRange { value: f32, limit_nm: f32 },
    #[error("input torque must be finite, got {0}")]
    NonFiniteTorque(f32),
    #[error("unknown axis state code 0x{0:02X}")]
    UnknownAxisState(u32),
    #[error("device identifier 0x{0:X} outside 0x01..=0xFF")]
    InvalidDeviceId(u16),
    #[error("CAN identifier 0x{0:X} does not fit 11 bits")]
    IdOutOfRange(u16),
    #[error("malformed data frame: expected {expected} payload bytes, got {got}")]
    MalformedFrame { expected: usize, got: usize },
    #[error("filter cutoff {cutoff_hz} Hz must be positive and below Nyquist ({nyquist_hz} Hz)")]
    InvalidFilterConfig { cutoff_hz: f32, nyquist_hz: f32 },
    #[error("controller not initialized; call initialize() first")]
    NotInitialized,
}
