use can_link::CanLink;
use tracing::info;

use crate::controller::{CancelToken, DriveController};
use crate::error::Result;

/// Two drives driven in lockstep, e.g. the left and right legs of a rig.
///
/// Pure delegation: every operation runs on the left drive first, then the
/// right. There is no bus arbitration or timing coordination here; if both
/// controllers share one physical bus the caller serializes access by
/// construction, since calls are strictly sequential.
pub struct DrivePair<L: CanLink> {
    left: DriveController<L>,
    right: DriveController<L>,
}

impl<L: CanLink> DrivePair<L> {
    pub fn new(left: DriveController<L>, right: DriveController<L>) -> Self {
        Self { left, right }
    }

    pub fn left(&mut self) -> &mut DriveController<L> {
        &mut self.left
    }

    pub fn right(&mut self) -> &mut DriveController<L> {
        &mut self.right
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.left.initialize()?;
        self.right.initialize()
    }

    pub fn calibrate(&mut self, cancel: &CancelToken) -> Result<()> {
        info!("calibrating drive pair");
        self.left.calibrate(cancel)?;
        self.right.calibrate(cancel)
    }

    pub fn set_torque_control_mode(&mut self) -> Result<()> {
        self.left.set_torque_control_mode()?;
        self.right.set_torque_control_mode()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.left.stop()?;
        self.right.stop()
    }

    pub fn set_input_torque(&mut self, left_nm: f32, right_nm: f32) -> Result<()> {
        self.left.set_input_torque(left_nm)?;
        self.right.set_input_torque(right_nm)
    }

    /// The motors in a pair are matched, so one torque constant covers both.
    pub fn torque_constant(&mut self) -> Result<f32> {
        self.left.torque_constant()
    }

    pub fn iq_measured(&mut self) -> Result<[f32; 2]> {
        Ok([self.left.iq_measured()?, self.right.iq_measured()?])
    }

    pub fn torque_estimate(&mut self) -> Result<[f32; 2]> {
        Ok([self.left.torque_estimate()?, self.right.torque_estimate()?])
    }

    pub fn vel_estimate(&mut self) -> Result<[f32; 2]> {
        Ok([self.left.vel_estimate()?, self.right.vel_estimate()?])
    }

    pub fn pos_estimate(&mut self) -> Result<[f32; 2]> {
        Ok([self.left.pos_estimate()?, self.right.pos_estimate()?])
    }
}
