//! MidiSystem builder and plain configuration.

use std::sync::Arc;

use arc_swap::ArcSwap;
use midiwire_proto::{Clock, SystemClock};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{MidiSystem, MidiSystemInner};

pub const DEFAULT_CLIENT_NAME: &str = "midiwire";
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Settings a host can keep in its own config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Allow output ports to send system exclusive messages.
    pub sysex_enabled: bool,
    /// Client name reported to the host MIDI API.
    pub client_name: String,
    /// Capacity of queued and hardware output channels.
    pub queue_capacity: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sysex_enabled: false,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

pub struct MidiSystemBuilder {
    pub(super) config: SystemConfig,
    pub(super) clock: Option<Arc<dyn Clock>>,
}

#[allow(clippy::derivable_impls)]
impl Default for MidiSystemBuilder {
    fn default() -> Self {
        Self {
            config: SystemConfig::default(),
            clock: None,
        }
    }
}

impl MidiSystemBuilder {
    pub fn from_config(config: SystemConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn sysex(mut self, enabled: bool) -> Self {
        self.config.sysex_enabled = enabled;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Time source for arrival stamps and send-time resolution.
    /// Defaults to a [`SystemClock`] started at build time.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<MidiSystem> {
        if self.config.queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.config.client_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "client_name must not be empty".to_string(),
            ));
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);

        tracing::debug!(
            "Building MIDI system '{}' (sysex: {})",
            self.config.client_name,
            self.config.sysex_enabled
        );

        Ok(MidiSystem {
            inner: Arc::new(MidiSystemInner {
                config: self.config,
                clock,
                inputs: ArcSwap::from_pointee(Vec::new()),
                outputs: ArcSwap::from_pointee(Vec::new()),
                next_input: Default::default(),
                next_output: Default::default(),
                #[cfg(feature = "midi-io")]
                hardware_inputs: Default::default(),
            }),
        })
    }
}
