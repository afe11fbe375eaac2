//! Wire protocol tables and frame codecs for ODrive-class drives.
//!
//! Identifiers are composed by bitwise OR of the device base address with a
//! fixed offset, so every constant here is wire-compatible with the real
//! hardware and must not change. Data payloads are 4-byte little-endian
//! IEEE-754 floats; command payloads are a single command-code byte.

use crate::{DriveError, Result};
use can_link::{CanFrame, CanId};

/// Identifier base for control-mode commands.
pub const CONTROL_MODE_BASE: u16 = 0x100;
/// Identifier base for axis-state commands.
pub const AXIS_STATE_BASE: u16 = 0x200;

/// CAN base address of one physical drive.
///
/// Restricted to `0x01..=0xFF` so OR-composition with the command bases and
/// parameter offsets is carry-free and the two command bases can never alias.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DeviceId(u16);

impl DeviceId {
    pub fn new(raw: u16) -> Result<Self> {
        if raw == 0 || raw > 0xFF {
            return Err(DriveError::InvalidDeviceId(raw));
        }
        Ok(Self(raw))
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

/// Axis state machine states, as reported and requested on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum AxisState {
    Idle = 0x00,
    MotorCalibration = 0x01,
    EncoderOffsetCalibration = 0x03,
    ClosedLoopControl = 0x08,
}

impl AxisState {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a reported state code. Unknown codes are surfaced to the
    /// caller rather than silently mapped.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x00 => Some(AxisState::Idle),
            0x01 => Some(AxisState::MotorCalibration),
            0x03 => Some(AxisState::EncoderOffsetCalibration),
            0x08 => Some(AxisState::ClosedLoopControl),
            _ => None,
        }
    }
}

/// Control modes. Only torque control is used today.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ControlMode {
    TorqueControl = 0x0A,
}

impl ControlMode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Telemetry and setpoint parameters with their identifier offsets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum Parameter {
    InputTorque = 0x0C,
    TorqueConstant = 0x0D,
    IqMeasured = 0x0E,
    TorqueEstimate = 0x0F,
    VelEstimate = 0x10,
    PosEstimate = 0x11,
}

impl Parameter {
    pub fn offset(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Parameter::InputTorque => "input_torque",
            Parameter::TorqueConstant => "torque_constant",
            Parameter::IqMeasured => "iq_measured",
            Parameter::TorqueEstimate => "torque_estimate",
            Parameter::VelEstimate => "vel_estimate",
            Parameter::PosEstimate => "pos_estimate",
        }
    }
}

/// A single-byte command addressed to one drive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    SetControlMode(ControlMode),
    RequestState(AxisState),
}

impl Command {
    fn base(self) -> u16 {
        match self {
            Command::SetControlMode(_) => CONTROL_MODE_BASE,
            Command::RequestState(_) => AXIS_STATE_BASE,
        }
    }

    fn code(self) -> u8 {
        match self {
            Command::SetControlMode(mode) => mode.code(),
            Command::RequestState(state) => state.code(),
        }
    }
}

fn standard_id(raw: u16) -> Result<CanId> {
    CanId::standard(raw).ok_or(DriveError::IdOutOfRange(raw))
}

/// Identifier of a command frame: `device | 0x100` or `device | 0x200`.
pub fn command_id(device: DeviceId, command: Command) -> Result<CanId> {
    standard_id(device.raw() | command.base())
}

/// Identifier of a telemetry/setpoint data frame: `device | offset`.
pub fn telemetry_id(device: DeviceId, parameter: Parameter) -> Result<CanId> {
    standard_id(device.raw() | parameter.offset())
}

/// Identifier of the axis-state report frame: the bare device address.
pub fn state_id(device: DeviceId) -> Result<CanId> {
    standard_id(device.raw())
}

/// Build a command frame: payload is exactly the one command-code byte.
pub fn command_frame(device: DeviceId, command: Command) -> Result<CanFrame> {
    let id = command_id(device, command)?;
    let mut data = [0u8; 8];
    data[0] = command.code();
    Ok(CanFrame {
        id,
        len: 1,
        data,
        rtr: false,
        timestamp: None,
    })
}

/// Build a data frame: payload is exactly the 4 little-endian float bytes.
pub fn data_frame(device: DeviceId, parameter: Parameter, value: f32) -> Result<CanFrame> {
    let id = telemetry_id(device, parameter)?;
    let mut data = [0u8; 8];
    data[..4].copy_from_slice(&value.to_le_bytes());
    Ok(CanFrame {
        id,
        len: 4,
        data,
        rtr: false,
        timestamp: None,
    })
}

/// Decode a 4-byte little-endian float payload.
pub fn decode_f32(frame: &CanFrame) -> Result<f32> {
    let payload = frame.payload();
    if payload.len() != 4 {
        return Err(DriveError::MalformedFrame {
            expected: 4,
            got: payload.len(),
        });
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(payload);
    Ok(f32::from_le_bytes(bytes))
}

/// Decode an axis-state report: first 4 payload bytes are the state code as
/// a little-endian `u32`.
pub fn decode_axis_state(frame: &CanFrame) -> Result<AxisState> {
    let payload = frame.payload();
    if payload.len() < 4 {
        return Err(DriveError::MalformedFrame {
            expected: 4,
            got: payload.len(),
        });
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&payload[..4]);
    let code = u32::from_le_bytes(bytes);
    AxisState::from_code(code).ok_or(DriveError::UnknownAxisState(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(raw: u16) -> DeviceId {
        DeviceId::new(raw).unwrap()
    }

    #[test]
    fn device_id_range() {
        assert!(DeviceId::new(0).is_err());
        assert!(DeviceId::new(0x100).is_err());
        assert!(DeviceId::new(0x01).is_ok());
        assert!(DeviceId::new(0xFF).is_ok());
    }

    #[test]
    fn data_frame_id_is_bitwise_or() {
        for raw in [0x01u16, 0x10, 0x42, 0xFF] {
            for param in [
                Parameter::InputTorque,
                Parameter::TorqueConstant,
                Parameter::IqMeasured,
                Parameter::TorqueEstimate,
                Parameter::VelEstimate,
                Parameter::PosEstimate,
            ] {
                let id = telemetry_id(dev(raw), param).unwrap();
                assert_eq!(id.raw(), u32::from(raw | param.offset()));
            }
        }
    }

    #[test]
    fn command_bases_are_never_swapped() {
        let device = dev(0x10);
        for state in [
            AxisState::Idle,
            AxisState::MotorCalibration,
            AxisState::EncoderOffsetCalibration,
            AxisState::ClosedLoopControl,
        ] {
            let frame = command_frame(device, Command::RequestState(state)).unwrap();
            assert_eq!(frame.id.raw() & 0x200, 0x200);
            assert_eq!(frame.id.raw() & 0x100, 0);
        }
        let frame =
            command_frame(device, Command::SetControlMode(ControlMode::TorqueControl)).unwrap();
        assert_eq!(frame.id.raw() & 0x100, 0x100);
        assert_eq!(frame.id.raw() & 0x200, 0);
    }

    #[test]
    fn command_payload_is_one_byte() {
        let frame = command_frame(dev(0x10), Command::RequestState(AxisState::Idle)).unwrap();
        assert_eq!(frame.payload(), &[0x00]);
        let frame = command_frame(
            dev(0x10),
            Command::SetControlMode(ControlMode::TorqueControl),
        )
        .unwrap();
        assert_eq!(frame.payload(), &[0x0A]);
    }

    #[test]
    fn wire_codes_match_the_device() {
        assert_eq!(AxisState::Idle.code(), 0x00);
        assert_eq!(AxisState::MotorCalibration.code(), 0x01);
        assert_eq!(AxisState::EncoderOffsetCalibration.code(), 0x03);
        assert_eq!(AxisState::ClosedLoopControl.code(), 0x08);
        assert_eq!(ControlMode::TorqueControl.code(), 0x0A);
        assert_eq!(Parameter::InputTorque.offset(), 0x0C);
        assert_eq!(Parameter::TorqueConstant.offset(), 0x0D);
        assert_eq!(Parameter::IqMeasured.offset(), 0x0E);
        assert_eq!(Parameter::TorqueEstimate.offset(), 0x0F);
        assert_eq!(Parameter::VelEstimate.offset(), 0x10);
        assert_eq!(Parameter::PosEstimate.offset(), 0x11);
    }

    #[test]
    fn float_roundtrip_is_exact() {
        let device = dev(0x10);
        for value in [
            0.0f32,
            -0.0,
            3.5,
            -123.456,
            f32::MIN_POSITIVE,
            1.0e-42, // subnormal
            -1.0e-42,
            f32::MAX,
            f32::MIN,
        ] {
            let frame = data_frame(device, Parameter::InputTorque, value).unwrap();
            assert_eq!(frame.len, 4);
            let decoded = decode_f32(&frame).unwrap();
            assert_eq!(decoded.to_bits(), value.to_bits());
        }
    }

    #[test]
    fn data_payload_is_little_endian() {
        let frame = data_frame(dev(0x10), Parameter::VelEstimate, 3.5).unwrap();
        assert_eq!(frame.payload(), &3.5f32.to_le_bytes());
    }

    #[test]
    fn decode_rejects_wrong_width() {
        let id = CanId::standard(0x1C).unwrap();
        let frame = CanFrame::new(id, &[1, 2]).unwrap();
        assert!(matches!(
            decode_f32(&frame),
            Err(DriveError::MalformedFrame { expected: 4, got: 2 })
        ));
    }

    #[test]
    fn axis_state_roundtrip_and_unknown_code() {
        let id = CanId::standard(0x10).unwrap();
        for state in [
            AxisState::Idle,
            AxisState::MotorCalibration,
            AxisState::EncoderOffsetCalibration,
            AxisState::ClosedLoopControl,
        ] {
            let frame = CanFrame::new(id, &u32::from(state.code()).to_le_bytes()).unwrap();
            assert_eq!(decode_axis_state(&frame).unwrap(), state);
        }
        let frame = CanFrame::new(id, &2u32.to_le_bytes()).unwrap();
        assert!(matches!(
            decode_axis_state(&frame),
            Err(DriveError::UnknownAxisState(2))
        ));
    }
}
