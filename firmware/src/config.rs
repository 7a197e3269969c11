//! Per-box build configuration.

use notibox_core::datetime::datetime::Date;

pub const WIFI_SSID: &str = "box-home";
pub const WIFI_PASSWORD: &str = "replace-me";

// Proxy service shared with the phone app; the token authenticates this box
pub const SERVER_DOMAIN: &str = "https://notibox-proxy.example.com";
pub const AUTH_TOKEN: &str = "replace-me-token";

pub const UTC_OFFSET_HOURS: i32 = -5;

/// The date the day counter on the display counts from.
pub const ANNIVERSARY: Date = Date {
    year: 2019,
    month: 6,
    day: 21,
};

// Defaults for the nightly display-off window, used until the server
// provides its own
pub const SLEEP_START_HOUR: u32 = 22;
pub const SLEEP_MINUTES: u32 = 480;

pub const BUTTON_POLL_INTERVAL_US: u64 = 10_000;
pub const RENDER_INTERVAL_US: u64 = 1_000_000;
pub const FLAG_CHECK_INTERVAL_US: u64 = 30_000_000;
pub const TIME_SYNC_INTERVAL_US: u64 = 3_600_000_000;
pub const MENU_TIMEOUT_US: u64 = 10_000_000;
pub const ERROR_SHOW_US: u64 = 2_000_000;
