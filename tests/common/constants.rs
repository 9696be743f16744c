//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, seeded games, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user name
pub const TEST_USER: &str = "testuser";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Second regular test user name (for ownership tests)
pub const OTHER_USER: &str = "otheruser";

/// Second regular test user password
pub const OTHER_PASS: &str = "otherpass123";

/// Admin test user name
pub const ADMIN_USER: &str = "admin";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Seeded Catalog Games
// ============================================================================

/// Game ID for "Star Courier"
pub const GAME_1_ID: &str = "game-1";

/// Game ID for "Dungeon Loop"
pub const GAME_2_ID: &str = "game-2";

/// Game 1 title
pub const GAME_1_TITLE: &str = "Star Courier";

/// Game 2 title
pub const GAME_2_TITLE: &str = "Dungeon Loop";

// ============================================================================
// GitHub OAuth Stub Identity
// ============================================================================

/// Numeric GitHub id served by the stub profile endpoint
pub const GITHUB_STUB_ID: i64 = 583231;

/// GitHub login served by the stub profile endpoint
pub const GITHUB_STUB_LOGIN: &str = "octocat";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
