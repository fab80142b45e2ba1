//! Command frame builders and response buffers
//!
//! One module per functional group. Builders return the complete frame,
//! command byte and frame length included, ready to pass to the frame layer.
//! Fixed-size responses are read into the matching `*Rsp` buffer struct and
//! picked apart through its accessors.

pub mod cmd_boot;
pub mod cmd_drive;
pub mod cmd_flux;
pub mod cmd_system;
