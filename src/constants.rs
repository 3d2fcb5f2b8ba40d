//! # Constants for the XEPH format
//!
//! This module centralizes the **format constants** of the XEPH ephemeris store
//! and the configuration keys used by the global dataset registry.
//!
//! ## Overview
//!
//! - File signature (magic, size, minimum header length)
//! - Binary index node size and coefficient word size
//! - Limits on expansion dimensions
//! - Default metadata tags written by the serializer
//! - Environment keys consulted by [`crate::registry`]

// -------------------------------------------------------------------------------------------------
// File layout
// -------------------------------------------------------------------------------------------------

/// Magic bytes opening every XEPH file (format identifier + version 01.00)
pub const XEPH_MAGIC: [u8; 8] = *b"XEPH0100";

/// Size in bytes of the binary file signature (magic + header length + reserved word)
pub const SIGNATURE_SIZE: usize = 16;

/// Minimum length of an empty XEPH header, from `<?xml...` to `</xeph>`
pub const MIN_HEADER_LENGTH: u32 = 65;

/// Version attribute of the `xeph` root element
pub const XEPH_VERSION: &str = "1.0";

/// File suffix of XEPH ephemeris files
pub const XEPH_FILE_SUFFIX: &str = ".xeph";

/// Size in bytes of a serialized index node
pub const INDEX_NODE_SIZE: usize = 24;

/// Size in bytes of a serialized Chebyshev coefficient (little-endian f64)
pub const COEFFICIENT_SIZE: usize = 8;

/// Maximum number of vector components per expansion
pub const MAX_COMPONENTS: usize = 4;

/// Maximum number of coefficients per component (stored as a `u8`)
pub const MAX_COEFFICIENTS: usize = u8::MAX as usize;

/// Maximum number of derivative orders stored per object (function + first derivative)
pub const MAX_DERIVATIVE_ORDERS: usize = 2;

// -------------------------------------------------------------------------------------------------
// Serializer metadata
// -------------------------------------------------------------------------------------------------

/// Comment written before the root element of every generated header
pub const XEPH_HEADER_COMMENT: &str = "\nXEPH Planetary Ephemeris Data Format - version 1.0\n";

/// Default creator application tag written when the caller leaves it empty
pub fn default_creator_application() -> String {
    format!("xeph {}", env!("CARGO_PKG_VERSION"))
}

/// Name of the operating system the serializer is running on
pub fn creator_os() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

// -------------------------------------------------------------------------------------------------
// Registry configuration keys
// -------------------------------------------------------------------------------------------------

pub const ENV_FUNDAMENTAL_EPHEMERIDES: &str = "XEPH_FUNDAMENTAL_EPHEMERIDES";
pub const ENV_SHORT_TERM_FUNDAMENTAL_EPHEMERIDES: &str = "XEPH_SHORT_TERM_FUNDAMENTAL_EPHEMERIDES";
pub const ENV_ASTEROID_EPHEMERIDES: &str = "XEPH_ASTEROID_EPHEMERIDES";
pub const ENV_SHORT_TERM_ASTEROID_EPHEMERIDES: &str = "XEPH_SHORT_TERM_ASTEROID_EPHEMERIDES";
pub const ENV_NUTATION_MODEL: &str = "XEPH_NUTATION_MODEL";
pub const ENV_SHORT_TERM_NUTATION_MODEL: &str = "XEPH_SHORT_TERM_NUTATION_MODEL";
pub const ENV_DELTA_T_DATA: &str = "XEPH_DELTA_T_DATA";
pub const ENV_DELTA_AT_DATA: &str = "XEPH_DELTA_AT_DATA";
pub const ENV_CIP_ITRS_DATA: &str = "XEPH_CIP_ITRS_DATA";
