//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, fixture bytes, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user (viewer in most scenarios)
pub const TEST_USER: &str = "testuser";
pub const TEST_USER_EMAIL: &str = "testuser@example.com";
pub const TEST_PASS: &str = "testpass123";

/// Second test user (channel owner / content creator)
pub const CREATOR_USER: &str = "creator";
pub const CREATOR_USER_EMAIL: &str = "creator@example.com";
pub const CREATOR_PASS: &str = "creatorpass123";

// ============================================================================
// Test Upload Fixtures
// ============================================================================

/// Minimal JPEG: enough magic bytes for content sniffing.
pub const TEST_IMAGE_BYTES: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
];

/// Minimal MP4: an `ftyp` box with the mp42 brand.
pub const TEST_VIDEO_BYTES: &[u8] = &[
    0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', b'm', b'p', b'4', b'2', 0x00, 0x00, 0x00,
    0x00, b'm', b'p', b'4', b'2', b'i', b's', b'o', b'm',
];

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
