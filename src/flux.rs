//! # Track reads and writes
//!
//! A capture is a free-running stream of flux timings bracketed by index
//! pulses. The unit always captures one index pulse more than the requested
//! revolution count: everything ahead of the first pulse is a partial
//! revolution and is clipped here, so the returned record starts exactly on
//! an index boundary. Writes stream a pre-encoded track and confirm it with
//! a one-byte sync handshake before the status check.
//!
//! Capture overflows (reads) and data underruns (writes) are transient: the
//! pipelines retry them up to the caller's retry budget. Every other failure
//! propagates on first occurrence.
//!
//! ## Available Methods
//!
//! - [`read_track`](Fluxcap::read_track) - Read whole revolutions of flux
//! - [`read_track_cancellable`](Fluxcap::read_track_cancellable) - Same,
//!   with a cooperative cancellation flag
//! - [`write_track`](Fluxcap::write_track) - Write a flux sequence

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_io_async::{Read, Write};

use super::ack::Ack;
use super::{Fluxcap, FluxcapError, Port, codec};

pub use super::cmd::cmd_flux::*;

/// A whole-revolution flux record read from one track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flux {
    /// Tick count of each completed revolution, in occurrence order
    pub index_times: Vec<u32>,
    /// Ticks between successive flux transitions, spanning the revolutions
    pub flux_list: Vec<u32>,
    /// Sampling clock behind all tick values, in ticks per second
    pub sample_freq: u32,
}

impl Flux {
    /// Number of whole revolutions in the record
    pub fn revolutions(&self) -> usize {
        self.index_times.len()
    }
}

/// Cooperative cancellation flag for long captures.
///
/// Share a reference with whatever may want to interrupt (a signal handler,
/// another task); [`read_track_cancellable`](Fluxcap::read_track_cancellable)
/// checks it between transfers.
#[derive(Debug, Default)]
pub struct Cancellation(AtomicBool);

impl Cancellation {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Request cancellation of the capture in progress
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cut a capture down to its whole revolutions.
///
/// `to_index` is the tick count from capture start to the first index pulse.
/// The interval straddling that pulse is replaced by its portion lying after
/// the pulse; everything ahead of it is dropped. A capture that ends before
/// reaching the pulse yields an empty list.
fn clip_first_revolution(mut flux: Vec<u32>, to_index: u32) -> Vec<u32> {
    let mut rem = i64::from(to_index);
    for i in 0..flux.len() {
        rem -= i64::from(flux[i]);
        if rem < 0 {
            flux[i] = (-rem) as u32;
            return flux.split_off(i);
        }
    }
    Vec::new()
}

impl<P: Port> Fluxcap<P> {
    /// Read `nr_revs` whole revolutions of flux from the current track.
    ///
    /// The capture spans one extra index pulse; the leading partial
    /// revolution is clipped so the record starts on an index boundary.
    /// Transient capture overflows are retried up to `nr_retries` times.
    pub async fn read_track(&mut self, nr_revs: u8, nr_retries: u8) -> Result<Flux, FluxcapError> {
        let nr_idx = self.nr_idx(nr_revs)?;
        let mut retry = 0;
        let dat = loop {
            match self.read_flux_raw(nr_idx).await {
                Err(FluxcapError::Cmd(e)) if e.code == Ack::FluxOverflow && retry < nr_retries => {
                    retry += 1;
                }
                other => break other?,
            }
        };
        self.assemble_track(&dat, nr_idx).await
    }

    /// Like [`read_track`](Fluxcap::read_track), checking `cancel` between
    /// transfers.
    ///
    /// On cancellation the unit is recovered (comms reset, motor off,
    /// deselected) and `Ok(None)` is returned; no partial capture escapes.
    /// A future dropped mid-read skips that recovery: call
    /// [`recover`](Fluxcap::recover) before reusing the session.
    pub async fn read_track_cancellable(
        &mut self,
        nr_revs: u8,
        nr_retries: u8,
        cancel: &Cancellation,
    ) -> Result<Option<Flux>, FluxcapError> {
        let nr_idx = self.nr_idx(nr_revs)?;
        let mut retry = 0;
        let dat = loop {
            match self.read_flux_raw_cancellable(nr_idx, cancel).await {
                Ok(Some(dat)) => break dat,
                Ok(None) => {
                    self.recover().await?;
                    return Ok(None);
                }
                Err(FluxcapError::Cmd(e)) if e.code == Ack::FluxOverflow && retry < nr_retries => {
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        };
        Ok(Some(self.assemble_track(&dat, nr_idx).await?))
    }

    /// Write a flux sequence to the current track.
    ///
    /// The sequence is encoded once; transient underruns re-send the same
    /// encoding up to `nr_retries` times.
    pub async fn write_track(&mut self, flux: &[u32], nr_retries: u8) -> Result<(), FluxcapError> {
        self.ensure_normal()?;
        let dat = codec::encode_flux(flux)?;
        let mut retry = 0;
        loop {
            match self.write_flux_raw(&dat).await {
                Err(FluxcapError::Cmd(e)) if e.code == Ack::FluxUnderflow && retry < nr_retries => {
                    retry += 1;
                }
                other => return other,
            }
        }
    }

    /// Index count for a capture of `nr_revs` whole revolutions: one extra
    /// pulse locates the start of the first whole revolution.
    fn nr_idx(&self, nr_revs: u8) -> Result<u8, FluxcapError> {
        let max = u32::from(self.max_index().ok_or(FluxcapError::WrongMode)?);
        let nr_idx = u32::from(nr_revs) + 1;
        if nr_idx > max {
            return Err(FluxcapError::OutOfRange(nr_idx));
        }
        Ok(nr_idx as u8)
    }

    /// Stream one capture to completion and check its status
    async fn read_flux_raw(&mut self, nr_idx: u8) -> Result<Vec<u8>, FluxcapError> {
        self.send_cmd(&read_flux_cmd(nr_idx)).await?;
        let mut dat = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            let n = self
                .port
                .read(&mut chunk)
                .await
                .map_err(|_| FluxcapError::Port)?;
            if n == 0 {
                return Err(FluxcapError::Port); // channel closed mid-stream
            }
            dat.extend_from_slice(&chunk[..n]);
            if dat[dat.len() - 1] == 0 {
                break;
            }
        }
        self.send_cmd(&get_flux_status_cmd()).await?;
        Ok(dat)
    }

    async fn read_flux_raw_cancellable(
        &mut self,
        nr_idx: u8,
        cancel: &Cancellation,
    ) -> Result<Option<Vec<u8>>, FluxcapError> {
        self.send_cmd(&read_flux_cmd(nr_idx)).await?;
        let mut dat = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let n = self
                .port
                .read(&mut chunk)
                .await
                .map_err(|_| FluxcapError::Port)?;
            if n == 0 {
                return Err(FluxcapError::Port);
            }
            dat.extend_from_slice(&chunk[..n]);
            if dat[dat.len() - 1] == 0 {
                break;
            }
        }
        self.send_cmd(&get_flux_status_cmd()).await?;
        Ok(Some(dat))
    }

    async fn get_index_times(&mut self, nr: u8) -> Result<Vec<u32>, FluxcapError> {
        self.send_cmd(&get_index_times_req(nr)).await?;
        let mut dat = vec![0u8; 4 * nr as usize];
        self.read_rsp(&mut dat).await?;
        Ok(parse_index_times(&dat))
    }

    /// Decode a finished capture, align it to the first index pulse and
    /// package it with the revolution timings
    async fn assemble_track(&mut self, dat: &[u8], nr_idx: u8) -> Result<Flux, FluxcapError> {
        let flux_list = codec::decode_flux(dat)?;
        let mut index_times = self.get_index_times(nr_idx).await?;
        let to_index = index_times.remove(0);
        let flux_list = clip_first_revolution(flux_list, to_index);
        let sample_freq = self.sample_freq().ok_or(FluxcapError::WrongMode)?;
        Ok(Flux {
            index_times,
            flux_list,
            sample_freq,
        })
    }

    async fn write_flux_raw(&mut self, dat: &[u8]) -> Result<(), FluxcapError> {
        self.send_cmd(&write_flux_cmd()).await?;
        self.port
            .write_all(dat)
            .await
            .map_err(|_| FluxcapError::Port)?;
        // The unit holds the sync byte back until the write has landed; its
        // value carries nothing.
        let mut sync = [0u8; 1];
        self.read_rsp(&mut sync).await?;
        self.send_cmd(&get_flux_status_cmd()).await
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn clip_replaces_straddling_interval_with_residual() {
        assert_eq!(clip_first_revolution(vec![100, 50, 200], 120), vec![30, 200]);
    }

    #[test]
    fn clip_on_exact_boundary_consumes_whole_interval() {
        // 100 + 50 lands exactly on the pulse; the next interval is the
        // first one lying after it and is kept whole.
        assert_eq!(clip_first_revolution(vec![100, 50, 200], 150), vec![200]);
    }

    #[test]
    fn clip_with_zero_lead_keeps_everything() {
        assert_eq!(clip_first_revolution(vec![100, 50], 0), vec![100, 50]);
    }

    #[test]
    fn clip_past_capture_end_yields_empty() {
        assert_eq!(clip_first_revolution(vec![10, 20], 100), Vec::<u32>::new());
    }
}
