//! # FluxCap host driver
//!
//! Driver for the FluxCap unit, a USB-attached controller that captures and
//! replays raw magnetic flux on floppy disks one track at a time. The unit
//! appears to the host as a serial byte channel; this crate speaks its framed
//! command protocol and the variable-length flux-stream encoding used on it.
//!
//! The transport is abstracted behind the [`Port`] trait so the driver runs
//! against any async serial implementation, desktop or embedded. Attaching
//! with [`Fluxcap::new`] resynchronises the unit and negotiates its firmware
//! version, capabilities and delay parameters.
//!
//! A unit answers the capability query in one of three shapes, captured by
//! [`Capabilities`]:
//!
//! - `Normal`: main firmware, matching this crate's supported version; the
//!   full command set is available.
//! - `NeedsUpdate`: main firmware with a version this crate does not support;
//!   nothing but a firmware update will be accepted.
//! - `Bootloader`: the update-mode bootloader; only
//!   [`update_firmware`](Fluxcap::update_firmware) works.
//!
//! ## Method groups
//!
//! - Track I/O: [`read_track`](Fluxcap::read_track),
//!   [`read_track_cancellable`](Fluxcap::read_track_cancellable),
//!   [`write_track`](Fluxcap::write_track) (see [`flux`])
//! - Drive control: [`seek`](Fluxcap::seek),
//!   [`drive_select`](Fluxcap::drive_select),
//!   [`drive_motor`](Fluxcap::drive_motor),
//!   [`with_drive`](Fluxcap::with_drive), delay setters (see [`drive`])
//! - Recovery: [`reset`](Fluxcap::reset), [`recover`](Fluxcap::recover)
//! - Firmware: [`update_firmware`](Fluxcap::update_firmware) (see [`update`])

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use embedded_io_async::{Read, Write};

pub mod ack;
pub mod cmd;
pub mod codec;
pub mod drive;
pub mod flux;
pub mod update;

pub use ack::{Ack, CmdError};
pub use cmd::cmd_system::Delays;
pub use flux::{Cancellation, Flux};

use cmd::cmd_system::{DelaysRsp, InfoRsp, get_delays_req, get_info_req};

/// Firmware major version this driver is built for
pub const FW_MAJOR: u8 = 0;
/// Firmware minor version this driver is built for
pub const FW_MINOR: u8 = 22;

/// Baud rate whose selection the unit treats as a comms-clear signal
pub const BAUD_CLEAR_COMMS: u32 = 10_000;
/// Baud rate for normal operation
pub const BAUD_NORMAL: u32 = 9_600;

/// Serial byte channel to the unit.
///
/// Data moves through the `embedded-io-async` read/write traits. The three
/// control operations cover what the reset protocol needs beyond plain bytes:
/// retuning the baud rate and discarding whatever sits in either buffer.
pub trait Port: Read + Write {
    /// Change the baud rate
    fn set_baudrate(&mut self, baud: u32) -> Result<(), Self::Error>;
    /// Discard any received bytes not yet read
    fn flush_input(&mut self) -> Result<(), Self::Error>;
    /// Discard any written bytes not yet transmitted
    fn flush_output(&mut self) -> Result<(), Self::Error>;
}

/// Driver error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FluxcapError {
    /// The unit acknowledged a command with a failure code
    Cmd(CmdError),
    /// The port failed or closed mid-exchange
    Port,
    /// An acknowledgement echoed a different command than the one sent
    EchoMismatch { sent: u8, got: u8 },
    /// A flux stream was truncated or carried a zero outside its terminator
    BadFluxStream,
    /// A value does not fit the wire format
    OutOfRange(u32),
    /// The operation is not available in the unit's current mode
    WrongMode,
    /// The command byte is above the ceiling this firmware accepts
    Unsupported(u8),
}

impl core::fmt::Display for FluxcapError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FluxcapError::Cmd(e) => write!(f, "{e}"),
            FluxcapError::Port => write!(f, "transport failure"),
            FluxcapError::EchoMismatch { sent, got } => {
                write!(f, "acknowledgement for command {got} while awaiting {sent}")
            }
            FluxcapError::BadFluxStream => {
                write!(f, "flux stream truncated or missing its terminator")
            }
            FluxcapError::OutOfRange(v) => write!(f, "value {v} does not fit the wire format"),
            FluxcapError::WrongMode => {
                write!(f, "operation not available in the unit's current mode")
            }
            FluxcapError::Unsupported(c) => {
                write!(f, "command {c} above the unit's accepted ceiling")
            }
        }
    }
}

/// What the unit reported about itself at attach time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Capabilities {
    /// Main firmware at the supported version; full command set
    Normal {
        /// Maximum index timings the unit records per capture
        max_index: u8,
        /// Highest command byte this firmware accepts
        max_cmd: u8,
        /// Sampling clock, in ticks per second
        sample_freq: u32,
    },
    /// Main firmware at an unsupported version; update before use
    NeedsUpdate,
    /// The update-mode bootloader is running
    Bootloader {
        /// Whether the physical update jumper is installed
        jumpered: bool,
    },
}

/// An attached FluxCap unit
#[derive(Debug)]
pub struct Fluxcap<P: Port> {
    port: P,
    major: u8,
    minor: u8,
    caps: Capabilities,
    delays: Option<Delays>,
}

impl<P: Port> Fluxcap<P> {
    /// Attach to the unit behind `port`.
    ///
    /// Resets communications, queries identification and capabilities, and in
    /// normal mode fetches the current delay parameters.
    pub async fn new(port: P) -> Result<Self, FluxcapError> {
        let mut unit = Fluxcap {
            port,
            major: 0,
            minor: 0,
            caps: Capabilities::NeedsUpdate,
            delays: None,
        };
        unit.reset().await?;

        unit.send_cmd(&get_info_req()).await?;
        let mut rsp = InfoRsp::new();
        unit.read_rsp(rsp.as_mut()).await?;
        unit.major = rsp.major();
        unit.minor = rsp.minor();

        // A bootloader reports no index capacity; its sample_freq field
        // carries the update-jumper flag in bit 0.
        if rsp.max_index() == 0 {
            unit.caps = Capabilities::Bootloader {
                jumpered: rsp.sample_freq() & 1 != 0,
            };
            return Ok(unit);
        }
        if (unit.major, unit.minor) != (FW_MAJOR, FW_MINOR) {
            return Ok(unit); // caps stay NeedsUpdate
        }
        unit.caps = Capabilities::Normal {
            max_index: rsp.max_index(),
            max_cmd: rsp.max_cmd(),
            sample_freq: rsp.sample_freq(),
        };

        unit.send_cmd(&get_delays_req()).await?;
        let mut rsp = DelaysRsp::new();
        unit.read_rsp(rsp.as_mut()).await?;
        unit.delays = Some(rsp.delays());
        Ok(unit)
    }

    /// Resynchronise communications with the unit.
    ///
    /// The baud-rate toggle is recognised by the unit as a comms clear: a
    /// command left half-finished is abandoned and its pending
    /// acknowledgement discarded. No data bytes move during the sequence.
    pub async fn reset(&mut self) -> Result<(), FluxcapError> {
        self.port.flush_output().map_err(|_| FluxcapError::Port)?;
        self.port
            .set_baudrate(BAUD_CLEAR_COMMS)
            .map_err(|_| FluxcapError::Port)?;
        self.port
            .set_baudrate(BAUD_NORMAL)
            .map_err(|_| FluxcapError::Port)?;
        self.port.flush_input().map_err(|_| FluxcapError::Port)
    }

    /// Firmware version reported at attach time
    pub fn firmware_version(&self) -> (u8, u8) {
        (self.major, self.minor)
    }

    /// Capability shape reported at attach time
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Whether the unit is running its bootloader
    pub fn update_mode(&self) -> bool {
        matches!(self.caps, Capabilities::Bootloader { .. })
    }

    /// Whether the main firmware version differs from the supported one
    pub fn update_needed(&self) -> bool {
        matches!(self.caps, Capabilities::NeedsUpdate)
    }

    /// Whether the physical update jumper is installed (bootloader mode only)
    pub fn update_jumpered(&self) -> Option<bool> {
        match self.caps {
            Capabilities::Bootloader { jumpered } => Some(jumpered),
            _ => None,
        }
    }

    /// Sampling clock in ticks per second (normal mode only)
    pub fn sample_freq(&self) -> Option<u32> {
        match self.caps {
            Capabilities::Normal { sample_freq, .. } => Some(sample_freq),
            _ => None,
        }
    }

    /// Maximum index timings the unit records per capture (normal mode only)
    pub fn max_index(&self) -> Option<u8> {
        match self.caps {
            Capabilities::Normal { max_index, .. } => Some(max_index),
            _ => None,
        }
    }

    /// Detach and hand the port back
    pub fn release(self) -> P {
        self.port
    }

    /// Send a command frame and check its two-byte acknowledgement
    async fn send_cmd(&mut self, frame: &[u8]) -> Result<(), FluxcapError> {
        if let Capabilities::Normal { max_cmd, .. } = self.caps {
            if frame[0] > max_cmd {
                return Err(FluxcapError::Unsupported(frame[0]));
            }
        }
        self.port
            .write_all(frame)
            .await
            .map_err(|_| FluxcapError::Port)?;
        let mut ack = [0u8; 2];
        self.port
            .read_exact(&mut ack)
            .await
            .map_err(|_| FluxcapError::Port)?;
        if ack[0] != frame[0] {
            return Err(FluxcapError::EchoMismatch {
                sent: frame[0],
                got: ack[0],
            });
        }
        Ack::from(ack[1]).check(frame[0])
    }

    /// Read the fixed-size response that follows an acknowledgement
    async fn read_rsp(&mut self, buf: &mut [u8]) -> Result<(), FluxcapError> {
        self.port
            .read_exact(buf)
            .await
            .map_err(|_| FluxcapError::Port)
    }

    fn ensure_normal(&self) -> Result<(), FluxcapError> {
        match self.caps {
            Capabilities::Normal { .. } => Ok(()),
            _ => Err(FluxcapError::WrongMode),
        }
    }
}
