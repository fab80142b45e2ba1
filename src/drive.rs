//! # Drive control and timing parameters
//!
//! Head positioning, drive selection and spindle motor control, plus the
//! unit's five delay parameters. The unit sequences the delays itself; the
//! host only programs them. Writing any single delay re-sends the whole
//! block, and the host-side copy always reflects the last block the unit
//! acknowledged.
//!
//! ## Available Methods
//!
//! ### Positioning and selection
//! - [`seek`](Fluxcap::seek) - Move the heads to a cylinder and side
//! - [`drive_select`](Fluxcap::drive_select) - Assert/release drive select
//! - [`drive_motor`](Fluxcap::drive_motor) - Start/stop the spindle motor
//! - [`with_drive`](Fluxcap::with_drive) - Run a closure with the drive
//!   selected and spinning, released again on every exit path
//! - [`recover`](Fluxcap::recover) - Reset comms and park the drive
//!
//! ### Delay parameters
//! - [`delays`](Fluxcap::delays) - Host-side copy of the delay block
//! - [`set_delays`](Fluxcap::set_delays) - Commit a full delay block
//! - [`set_select_delay`](Fluxcap::set_select_delay),
//!   [`set_step_delay`](Fluxcap::set_step_delay),
//!   [`set_seek_settle_delay`](Fluxcap::set_seek_settle_delay),
//!   [`set_motor_delay`](Fluxcap::set_motor_delay),
//!   [`set_auto_off_delay`](Fluxcap::set_auto_off_delay) - Single-field
//!   updates, each committing the whole block

use super::cmd::cmd_system::{Delays, set_delays_cmd};
use super::{Fluxcap, FluxcapError, Port};

pub use super::cmd::cmd_drive::*;

impl<P: Port> Fluxcap<P> {
    /// Seek the selected drive's heads to the given cylinder and side
    pub async fn seek(&mut self, cyl: u8, side: u8) -> Result<(), FluxcapError> {
        self.ensure_normal()?;
        self.send_cmd(&seek_cmd(cyl)).await?;
        self.send_cmd(&side_cmd(side)).await
    }

    /// Assert or release the drive select line
    pub async fn drive_select(&mut self, on: bool) -> Result<(), FluxcapError> {
        self.ensure_normal()?;
        self.send_cmd(&select_cmd(on)).await
    }

    /// Start or stop the selected drive's spindle motor
    pub async fn drive_motor(&mut self, on: bool) -> Result<(), FluxcapError> {
        self.ensure_normal()?;
        self.send_cmd(&motor_cmd(on)).await
    }

    /// Run `f` with the drive selected and the motor running.
    ///
    /// Select is asserted, the motor started, and whatever happens inside
    /// `f` the motor is stopped and select released before returning. An
    /// error from `f` wins over a release error.
    pub async fn with_drive<R, F>(&mut self, f: F) -> Result<R, FluxcapError>
    where
        F: AsyncFnOnce(&mut Self) -> Result<R, FluxcapError>,
    {
        self.drive_select(true).await?;
        let res = match self.drive_motor(true).await {
            Ok(()) => f(self).await,
            Err(e) => Err(e),
        };
        let motor = self.drive_motor(false).await;
        let select = self.drive_select(false).await;
        let val = res?;
        motor?;
        select?;
        Ok(val)
    }

    /// Return the unit to a known idle state after an interrupted operation:
    /// comms reset, motor off, drive deselected.
    pub async fn recover(&mut self) -> Result<(), FluxcapError> {
        self.reset().await?;
        self.drive_motor(false).await?;
        self.drive_select(false).await
    }

    /// Host-side copy of the delay block (normal mode only)
    pub fn delays(&self) -> Option<Delays> {
        self.delays
    }

    /// Commit a full delay block to the unit.
    ///
    /// The host-side copy is updated only once the unit acknowledges.
    pub async fn set_delays(&mut self, delays: Delays) -> Result<(), FluxcapError> {
        self.ensure_normal()?;
        self.send_cmd(&set_delays_cmd(&delays)).await?;
        self.delays = Some(delays);
        Ok(())
    }

    /// Set the delay (us) after asserting drive select
    pub async fn set_select_delay(&mut self, us: u16) -> Result<(), FluxcapError> {
        let mut delays = self.delays.ok_or(FluxcapError::WrongMode)?;
        delays.select_us = us;
        self.set_delays(delays).await
    }

    /// Set the delay (us) after a head-step pulse
    pub async fn set_step_delay(&mut self, us: u16) -> Result<(), FluxcapError> {
        let mut delays = self.delays.ok_or(FluxcapError::WrongMode)?;
        delays.step_us = us;
        self.set_delays(delays).await
    }

    /// Set the delay (ms) after completing a head seek
    pub async fn set_seek_settle_delay(&mut self, ms: u16) -> Result<(), FluxcapError> {
        let mut delays = self.delays.ok_or(FluxcapError::WrongMode)?;
        delays.settle_ms = ms;
        self.set_delays(delays).await
    }

    /// Set the delay (ms) after spinning up the motor
    pub async fn set_motor_delay(&mut self, ms: u16) -> Result<(), FluxcapError> {
        let mut delays = self.delays.ok_or(FluxcapError::WrongMode)?;
        delays.motor_ms = ms;
        self.set_delays(delays).await
    }

    /// Set the inactivity timeout (ms) before the unit parks all drives
    pub async fn set_auto_off_delay(&mut self, ms: u16) -> Result<(), FluxcapError> {
        let mut delays = self.delays.ok_or(FluxcapError::WrongMode)?;
        delays.auto_off_ms = ms;
        self.set_delays(delays).await
    }
}
