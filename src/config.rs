//! Scanner configuration.
//!
//! Every section has defaults matching the shipped extension, so an empty
//! JSON object is a valid configuration.
//!
//! # Example
//!
//! ```ignore
//! use qr_region_scanner::ScannerConfig;
//!
//! let config = ScannerConfig::from_json_str(r#"{
//!     "command": "scan-qr",
//!     "activation": { "readiness": { "mode": "handshake", "timeoutMs": 1500 } }
//! }"#)?;
//!
//! let config = ScannerConfig::new()
//!     .with_min_selection_size(16.0)
//!     .with_loading_timeout(Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::imaging::InversionMode;

// ============================================================================
// Constants
// ============================================================================

/// Command id bound to the global keyboard shortcut.
pub const DEFAULT_COMMAND: &str = "scan-qr";

/// Wait between injection and the retried activation.
const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Upper bound on waiting for the agent's ready message.
const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 2_000;

/// Minimum selection edge in device-independent pixels (exclusive).
const DEFAULT_MIN_SELECTION_SIZE: f64 = 10.0;

/// Lifetime of the scanning indicator.
const DEFAULT_LOADING_TIMEOUT_MS: u64 = 10_000;

/// Delay before the modal closes itself after a copy.
const DEFAULT_COPY_DISMISS_MS: u64 = 1_000;

// ============================================================================
// ScannerConfig
// ============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScannerConfig {
    /// Command id that triggers activation.
    pub command: String,

    /// Background activation protocol.
    pub activation: ActivationConfig,

    /// Selection gesture.
    pub selection: SelectionConfig,

    /// Capture-crop-decode pipeline and result modal.
    pub scan: ScanConfig,

    /// Bundled decoder.
    pub decoder: DecoderConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            activation: ActivationConfig::default(),
            selection: SelectionConfig::default(),
            scan: ScanConfig::default(),
            decoder: DecoderConfig::default(),
        }
    }
}

/// How the controller waits for a freshly injected agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Readiness {
    /// Sleep for a fixed delay before retrying.
    #[serde(rename_all = "camelCase")]
    FixedDelay {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// Wait for the agent's `agentReady` message, bounded by a timeout.
    #[serde(rename_all = "camelCase")]
    Handshake {
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },
}

impl Default for Readiness {
    fn default() -> Self {
        Self::FixedDelay {
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl Readiness {
    /// Creates a handshake readiness with the default timeout.
    #[inline]
    #[must_use]
    pub const fn handshake() -> Self {
        Self::Handshake {
            timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        }
    }

    /// Returns the delay or timeout as a duration.
    #[inline]
    #[must_use]
    pub const fn duration(&self) -> Duration {
        match self {
            Self::FixedDelay { delay_ms } => Duration::from_millis(*delay_ms),
            Self::Handshake { timeout_ms } => Duration::from_millis(*timeout_ms),
        }
    }
}

/// Background activation protocol settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivationConfig {
    /// Readiness strategy after injection.
    pub readiness: Readiness,

    /// Scripts injected into a tab that has no agent yet.
    pub agent_files: Vec<String>,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            readiness: Readiness::default(),
            agent_files: vec!["content.js".to_string()],
        }
    }
}

/// Selection gesture settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectionConfig {
    /// Both edges must be strictly greater than this (DIP).
    pub min_size: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SELECTION_SIZE,
        }
    }
}

/// Pipeline and modal timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Scanning indicator lifetime in milliseconds.
    pub loading_timeout_ms: u64,

    /// Modal auto-dismiss after copy, in milliseconds.
    pub copy_dismiss_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            loading_timeout_ms: DEFAULT_LOADING_TIMEOUT_MS,
            copy_dismiss_ms: DEFAULT_COPY_DISMISS_MS,
        }
    }
}

impl ScanConfig {
    /// Scanning indicator lifetime.
    #[inline]
    #[must_use]
    pub const fn loading_timeout(&self) -> Duration {
        Duration::from_millis(self.loading_timeout_ms)
    }

    /// Modal auto-dismiss delay after copy.
    #[inline]
    #[must_use]
    pub const fn copy_dismiss(&self) -> Duration {
        Duration::from_millis(self.copy_dismiss_ms)
    }
}

/// Bundled decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecoderConfig {
    /// Which luminance polarities to try.
    pub inversion: InversionMode,
}

// ============================================================================
// Constructors
// ============================================================================

impl ScannerConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration and validates it.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    /// - [`Error::Config`] if validation fails
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Json`] / [`Error::Config`] as in [`Self::from_json_str`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ScannerConfig {
    /// Sets the activation command id.
    #[inline]
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Sets the readiness strategy.
    #[inline]
    #[must_use]
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.activation.readiness = readiness;
        self
    }

    /// Replaces the injected agent files.
    #[inline]
    #[must_use]
    pub fn with_agent_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.activation.agent_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the minimum selection size (DIP).
    #[inline]
    #[must_use]
    pub fn with_min_selection_size(mut self, min_size: f64) -> Self {
        self.selection.min_size = min_size;
        self
    }

    /// Sets the scanning indicator lifetime.
    #[inline]
    #[must_use]
    pub fn with_loading_timeout(mut self, timeout: Duration) -> Self {
        self.scan.loading_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the modal auto-dismiss delay after copy.
    #[inline]
    #[must_use]
    pub fn with_copy_dismiss(mut self, delay: Duration) -> Self {
        self.scan.copy_dismiss_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the decoder inversion mode.
    #[inline]
    #[must_use]
    pub fn with_inversion(mut self, inversion: InversionMode) -> Self {
        self.decoder.inversion = inversion;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ScannerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(Error::config("command must not be empty"));
        }

        if self.activation.agent_files.is_empty() {
            return Err(Error::config("activation.agentFiles must not be empty"));
        }

        if let Readiness::Handshake { timeout_ms: 0 } = self.activation.readiness {
            return Err(Error::config("handshake timeout must be greater than zero"));
        }

        if !(self.selection.min_size.is_finite() && self.selection.min_size > 0.0) {
            return Err(Error::config("selection.minSize must be a positive number"));
        }

        if self.scan.loading_timeout_ms == 0 {
            return Err(Error::config("scan.loadingTimeoutMs must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
