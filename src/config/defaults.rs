use super::Config;

pub const ENABLED_SOURCES: &[&str] = &["lrclib", "netease"];

pub const SOURCE_TIMEOUT_SECS: u64 = 10;

pub const USER_AGENT: &str = concat!("lyricdb/", env!("CARGO_PKG_VERSION"));

pub fn defaults() -> Config {
    Config::default()
}
