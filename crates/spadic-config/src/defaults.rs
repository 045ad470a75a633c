use crate::logging::LogFormat;

/// Host the service listeners bind to unless configured otherwise.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Base port; each service listens on this value plus its offset.
pub const DEFAULT_PORT_BASE: u16 = 45000;

/// Interval after which a pending accept re-checks the shutdown flag.
pub const DEFAULT_ACCEPT_TIMEOUT_MS: u64 = 1000;

/// Size of each read issued against an accepted connection.
pub const DEFAULT_READ_CHUNK_BYTES: usize = 64;

/// Longest request line the decoder buffers before discarding it.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned default host, used by serde.
pub fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

/// Default base port, used by serde.
pub fn default_port_base() -> u16 {
    DEFAULT_PORT_BASE
}

/// Default accept timeout in milliseconds, used by serde.
pub fn default_accept_timeout_ms() -> u64 {
    DEFAULT_ACCEPT_TIMEOUT_MS
}

/// Default read chunk size, used by serde.
pub fn default_read_chunk_bytes() -> usize {
    DEFAULT_READ_CHUNK_BYTES
}

/// Default request line bound, used by serde.
pub fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
