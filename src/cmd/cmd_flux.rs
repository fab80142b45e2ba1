// Flux capture and replay commands API

use alloc::vec::Vec;

/// Start a flux capture spanning the given number of index pulses. The
/// encoded stream follows the acknowledgement and runs until its terminator.
pub fn read_flux_cmd(nr_idx: u8) -> [u8; 3] {
    [6, 3, nr_idx]
}

/// Arm a flux write. After the acknowledgement the unit expects the encoded
/// stream, then answers one sync byte once the write has landed.
pub fn write_flux_cmd() -> [u8; 7] {
    let mut cmd = [0u8; 7];
    cmd[0] = 7;
    cmd[1] = 7;
    cmd[6] = 1;
    cmd
}

/// Query the outcome of the last flux read or write
pub fn get_flux_status_cmd() -> [u8; 2] {
    [8, 2]
}

/// Request the index timings of the last capture. Response is `4 * nr` bytes.
pub fn get_index_times_req(nr: u8) -> [u8; 4] {
    [9, 4, 0, nr]
}

/// Unpack an index-times response into tick counts
pub fn parse_index_times(dat: &[u8]) -> Vec<u32> {
    dat.chunks_exact(4)
        .map(|b| {
            (b[0] as u32) | ((b[1] as u32) << 8) | ((b[2] as u32) << 16) | ((b[3] as u32) << 24)
        })
        .collect()
}
