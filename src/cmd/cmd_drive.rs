// Drive control commands API

/// Step the heads of the selected drive to the given cylinder
pub fn seek_cmd(cyl: u8) -> [u8; 3] {
    [1, 3, cyl]
}

/// Select which side of the disk the head reads
pub fn side_cmd(side: u8) -> [u8; 3] {
    [2, 3, side]
}

/// Turn the spindle motor of the selected drive on or off
pub fn motor_cmd(on: bool) -> [u8; 3] {
    [5, 3, on as u8]
}

/// Assert or release the drive select line
pub fn select_cmd(on: bool) -> [u8; 3] {
    [10, 3, on as u8]
}
