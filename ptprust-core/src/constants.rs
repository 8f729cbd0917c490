//! Protocol constants

/// PTP/IP TCP port
pub const DEFAULT_PORT: u16 = 15740;

/// Default connection timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 5;

/// Default read timeout (seconds)
pub const DEFAULT_READ_TIMEOUT: u64 = 5;

/// Upper bound for a single frame read from a channel (64MB)
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Canon EOS device property codes
pub mod eos_props {
    pub const APERTURE: u16 = 0xD101;
    pub const SHUTTER_SPEED: u16 = 0xD102;
    pub const ISO_SPEED: u16 = 0xD103;
    pub const EXPOSURE_COMPENSATION: u16 = 0xD104;
    pub const AUTO_EXPOSURE_MODE: u16 = 0xD105;
    pub const DRIVE_MODE: u16 = 0xD106;
    pub const METERING_MODE: u16 = 0xD107;
    pub const FOCUS_MODE: u16 = 0xD108;
    pub const WHITE_BALANCE: u16 = 0xD109;
    pub const COLOR_TEMPERATURE: u16 = 0xD10A;
    pub const PICTURE_STYLE: u16 = 0xD110;
    pub const BATTERY_POWER: u16 = 0xD111;
    pub const BATTERY_SELECT: u16 = 0xD112;
    pub const MODEL_ID: u16 = 0xD116;
    pub const AVAILABLE_SHOTS: u16 = 0xD11B;

    /// Where captured images are stored (card, host, both)
    pub const CAPTURE_DESTINATION: u16 = 0xD11C;
    pub const BRACKET_MODE: u16 = 0xD11D;
    pub const IMAGE_FORMAT: u16 = 0xD120;
    pub const IMAGE_FORMAT_CF: u16 = 0xD121;
    pub const EVF_OUTPUT_DEVICE: u16 = 0xD1B0;
    pub const EVF_MODE: u16 = 0xD1B1;
    pub const EVF_SHARPNESS: u16 = 0xD1B3;
    pub const EVF_WHITE_BALANCE: u16 = 0xD1B4;
}

/// Remote mode parameter for EosSetRemoteMode
pub mod remote_mode {
    pub const ON: u32 = 1;
}

/// Event mode parameter for EosSetEventMode
pub mod event_mode {
    pub const ON: u32 = 1;
}

/// Non-OK EosRemoteRelease response codes with a dedicated error
pub mod release_result {
    pub const NO_FOCUS: u16 = 1;
    pub const STORAGE_FULL: u16 = 7;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eos_property_codes() {
        let table = [
            (eos_props::APERTURE, 0xD101),
            (eos_props::ISO_SPEED, 0xD103),
            (eos_props::CAPTURE_DESTINATION, 0xD11C),
            (eos_props::BRACKET_MODE, 0xD11D),
            (eos_props::IMAGE_FORMAT_CF, 0xD121),
            (eos_props::EVF_OUTPUT_DEVICE, 0xD1B0),
            (eos_props::EVF_MODE, 0xD1B1),
            (eos_props::EVF_SHARPNESS, 0xD1B3),
            (eos_props::EVF_WHITE_BALANCE, 0xD1B4),
        ];

        for (constant, code) in table {
            assert_eq!(constant, code, "property 0x{:04X}", code);
        }
    }
}
