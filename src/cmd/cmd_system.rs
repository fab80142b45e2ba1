// System commands API

/// Parameter block selector for GetParams/SetParams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Param {
    Delays = 0,
}

/// Drive timing parameters, five 16-bit values written as one block
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Delays {
    /// Delay (us) after asserting drive select
    pub select_us: u16,
    /// Delay (us) after issuing a head-step pulse
    pub step_us: u16,
    /// Delay (ms) after completing a head seek
    pub settle_ms: u16,
    /// Delay (ms) after turning on the spindle motor
    pub motor_ms: u16,
    /// Inactivity timeout (ms) after which the unit deselects all drives
    /// and stops their motors on its own
    pub auto_off_ms: u16,
}

/// Request unit identification and capabilities. Response is 32 bytes.
pub fn get_info_req() -> [u8; 3] {
    [0, 3, 0]
}

/// Request the delay parameter block. Response is 10 bytes.
pub fn get_delays_req() -> [u8; 4] {
    [4, 4, Param::Delays as u8, 10]
}

/// Write the full delay parameter block in one frame
pub fn set_delays_cmd(delays: &Delays) -> [u8; 13] {
    let mut cmd = [0u8; 13];
    cmd[0] = 3;
    cmd[1] = 13;
    cmd[2] = Param::Delays as u8;
    let fields = [
        delays.select_us,
        delays.step_us,
        delays.settle_ms,
        delays.motor_ms,
        delays.auto_off_ms,
    ];
    for (i, val) in fields.into_iter().enumerate() {
        cmd[3 + 2 * i] = (val & 0xFF) as u8;
        cmd[4 + 2 * i] = (val >> 8) as u8;
    }
    cmd
}

// Response structs

/// Response for the GetInfo command
#[derive(Default)]
pub struct InfoRsp([u8; 32]);

impl InfoRsp {
    /// Create a new response buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Firmware major version
    pub fn major(&self) -> u8 {
        self.0[0]
    }

    /// Firmware minor version
    pub fn minor(&self) -> u8 {
        self.0[1]
    }

    /// Maximum index timings recorded per capture. Zero when the unit is
    /// running its bootloader.
    pub fn max_index(&self) -> u8 {
        self.0[2]
    }

    /// Highest command byte this firmware accepts
    pub fn max_cmd(&self) -> u8 {
        self.0[3]
    }

    /// Sampling clock, in ticks per second. In bootloader mode this field is
    /// repurposed: bit 0 flags the physical update jumper.
    pub fn sample_freq(&self) -> u32 {
        (self.0[4] as u32)
            | ((self.0[5] as u32) << 8)
            | ((self.0[6] as u32) << 16)
            | ((self.0[7] as u32) << 24)
    }
}

impl AsMut<[u8]> for InfoRsp {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Response for GetParams on the delay block
#[derive(Default)]
pub struct DelaysRsp([u8; 10]);

impl DelaysRsp {
    /// Create a new response buffer
    pub fn new() -> Self {
        Self::default()
    }

    fn field(&self, n: usize) -> u16 {
        (self.0[2 * n] as u16) | ((self.0[2 * n + 1] as u16) << 8)
    }

    /// Unpack the block into its five fields
    pub fn delays(&self) -> Delays {
        Delays {
            select_us: self.field(0),
            step_us: self.field(1),
            settle_ms: self.field(2),
            motor_ms: self.field(3),
            auto_off_ms: self.field(4),
        }
    }
}

impl AsMut<[u8]> for DelaysRsp {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}
