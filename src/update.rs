//! # Firmware update
//!
//! With the update jumper installed the unit boots into its bootloader and
//! reports itself with no capture capability. The bootloader accepts exactly
//! one operation: reflashing the main firmware.

use embedded_io_async::Write;

use super::{Capabilities, Fluxcap, FluxcapError, Port};

pub use super::cmd::cmd_boot::*;

impl<P: Port> Fluxcap<P> {
    /// Program a new firmware image into the unit.
    ///
    /// Only valid in bootloader mode. The image is announced, streamed, and
    /// then confirmed by a single status byte which is returned raw: 0 means
    /// the image was accepted and programmed.
    pub async fn update_firmware(&mut self, dat: &[u8]) -> Result<u8, FluxcapError> {
        match self.caps {
            Capabilities::Bootloader { .. } => {}
            _ => return Err(FluxcapError::WrongMode),
        }
        self.send_cmd(&update_cmd(dat.len() as u32)).await?;
        self.port
            .write_all(dat)
            .await
            .map_err(|_| FluxcapError::Port)?;
        let mut ack = [0u8; 1];
        self.read_rsp(&mut ack).await?;
        Ok(ack[0])
    }
}
