//! Application constants and configuration defaults

pub const LISTING_URL: &str =
    "https://api.github.com/repos/random-frame/random-frame-images/contents/images/output_img";
pub const RAW_BASE_URL: &str =
    "https://raw.githubusercontent.com/random-frame/random-frame-images/main/images/output_img/";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "Random Frame";
pub const USER_AGENT: &str = concat!("random-frame/", env!("CARGO_PKG_VERSION"));

/// Leading bytes of every PNG stream. Only the first four are compared.
pub const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
/// Number of header bytes read when sniffing an asset
pub const SNIFF_LEN: usize = 8;
/// Listing entries must end in one of these (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &[".png"];

pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;
pub const DEFAULT_NETWORK_RETRY_SECS: u64 = 10;
pub const DEFAULT_UNSUPPORTED_RETRY_SECS: u64 = 0;
pub const DEFAULT_DECODE_RETRY_SECS: u64 = 5;
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

/// Panel geometry (64x64 RGB matrix)
pub const DEFAULT_DISPLAY_WIDTH: u32 = 64;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 64;

pub const ASSET_FILE_NAME: &str = "current.png";
pub const SNAPSHOT_FILE_NAME: &str = "display.png";
