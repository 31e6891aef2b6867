//! # Sensor Registry and Validity Cache
//!
//! Static bindings from OBIS code to output channel, plus the last value seen
//! for each binding and when it arrived. Bindings are created once at startup
//! and never removed; every entry starts out stale until a checksum-verified
//! telegram delivers its code.
//!
//! ## Staleness
//!
//! An entry is stale when it has never been updated or when its last update is
//! older than the validity window. The registry does not track time by itself:
//! [`SensorRegistry::sweep`] is called from the host's periodic tick with the
//! current instant, so a meter that stops sending a code does not leave a
//! frozen value looking current.
//!
//! A validity window of zero disables age-based expiry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::DsmrError;

/// Opaque output handle a value is routed to, e.g. a sensor name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Channel(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Channel::new(name)
    }
}

/// OBIS code to channel binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    obis_code: String,
    channel: Channel,
}

impl Binding {
    pub fn obis_code(&self) -> &str {
        &self.obis_code
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

/// Output produced by the registry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SensorEvent {
    /// A verified telegram delivered a new value for the channel
    Value {
        channel: Channel,
        code: String,
        value: f64,
        unit: String,
    },
    /// The channel's staleness changed
    Stale { channel: Channel, stale: bool },
}

impl SensorEvent {
    pub fn channel(&self) -> &Channel {
        match self {
            SensorEvent::Value { channel, .. } | SensorEvent::Stale { channel, .. } => channel,
        }
    }
}

/// Cached state of one binding
#[derive(Debug, Clone)]
pub struct CacheEntry {
    binding: Binding,
    last_value: Option<f64>,
    last_unit: String,
    last_update: Option<Instant>,
    stale: bool,
}

impl CacheEntry {
    fn new(binding: Binding) -> Self {
        Self {
            binding,
            last_value: None,
            last_unit: String::new(),
            last_update: None,
            stale: true,
        }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    pub fn last_unit(&self) -> &str {
        &self.last_unit
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// Point-in-time view of a channel, as republished on every tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub channel: Channel,
    pub code: String,
    /// `None` when the value is stale or was never received
    pub value: Option<f64>,
    pub unit: String,
    pub stale: bool,
}

/// Statistics for registry monitoring
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Values written to an entry
    pub updates: u64,
    /// Lookups for codes without a binding
    pub unknown_codes: u64,
    /// Entries that went from fresh to stale
    pub expirations: u64,
}

#[derive(Debug)]
pub struct SensorRegistry {
    /// Entries in registration order
    entries: Vec<CacheEntry>,
    /// OBIS code to index of its authoritative entry
    index: HashMap<String, usize>,
    validity_window: Option<Duration>,
    stats: RegistryStats,
}

impl SensorRegistry {
    /// Create an empty registry; a zero `validity_window` disables expiry
    pub fn new(validity_window: Duration) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            validity_window: (!validity_window.is_zero()).then_some(validity_window),
            stats: RegistryStats::default(),
        }
    }

    pub fn validity_window(&self) -> Option<Duration> {
        self.validity_window
    }

    /// Bind `code` to `channel`.
    ///
    /// Only an empty code is rejected. Registering a code twice is tolerated:
    /// the first binding keeps receiving values, the later one stays stale.
    pub fn register(&mut self, code: &str, channel: Channel) -> Result<(), DsmrError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DsmrError::ConfigurationError(format!(
                "empty OBIS code for channel '{channel}'"
            )));
        }

        let position = self.entries.len();
        if let Some(&first) = self.index.get(code) {
            log::warn!(
                "OBIS code {code} already bound to '{}'; '{channel}' will not receive values",
                self.entries[first].binding.channel
            );
        } else {
            self.index.insert(code.to_string(), position);
        }

        log::debug!("Registered OBIS sensor {code} -> '{channel}'");
        self.entries.push(CacheEntry::new(Binding {
            obis_code: code.to_string(),
            channel,
        }));
        Ok(())
    }

    /// Store a verified value for `code`.
    ///
    /// Returns the events the update produced: a `Stale { stale: false }`
    /// transition if the entry was stale, followed by the `Value` itself.
    /// Codes without a binding yield [`DsmrError::UnknownCode`] and leave every
    /// entry untouched.
    pub fn update(
        &mut self,
        code: &str,
        value: f64,
        unit: &str,
        now: Instant,
    ) -> Result<Vec<SensorEvent>, DsmrError> {
        let Some(&position) = self.index.get(code) else {
            self.stats.unknown_codes += 1;
            return Err(DsmrError::UnknownCode(code.to_string()));
        };

        let entry = &mut self.entries[position];
        let mut events = Vec::with_capacity(2);
        if entry.stale {
            events.push(SensorEvent::Stale {
                channel: entry.binding.channel.clone(),
                stale: false,
            });
        }

        entry.last_value = Some(value);
        entry.last_unit.clear();
        entry.last_unit.push_str(unit);
        entry.last_update = Some(now);
        entry.stale = false;
        self.stats.updates += 1;

        events.push(SensorEvent::Value {
            channel: entry.binding.channel.clone(),
            code: entry.binding.obis_code.clone(),
            value,
            unit: unit.to_string(),
        });
        Ok(events)
    }

    /// Mark entries whose value is too old as stale, returning the transitions
    pub fn sweep(&mut self, now: Instant) -> Vec<SensorEvent> {
        let mut events = Vec::new();
        for entry in self.entries.iter_mut() {
            if entry.stale || !is_expired(entry.last_update, now, self.validity_window) {
                continue;
            }
            entry.stale = true;
            self.stats.expirations += 1;
            log::debug!(
                "OBIS {} ('{}') expired",
                entry.binding.obis_code,
                entry.binding.channel
            );
            events.push(SensorEvent::Stale {
                channel: entry.binding.channel.clone(),
                stale: true,
            });
        }
        events
    }

    /// Current state of every channel in registration order
    pub fn snapshot(&self) -> Vec<SensorState> {
        self.entries
            .iter()
            .map(|entry| SensorState {
                channel: entry.binding.channel.clone(),
                code: entry.binding.obis_code.clone(),
                value: if entry.stale { None } else { entry.last_value },
                unit: entry.last_unit.clone(),
                stale: entry.stale,
            })
            .collect()
    }

    /// The entry receiving values for `code`
    pub fn get(&self, code: &str) -> Option<&CacheEntry> {
        self.index.get(code).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }
}

fn is_expired(last_update: Option<Instant>, now: Instant, window: Option<Duration>) -> bool {
    match (last_update, window) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(at), Some(window)) => now.saturating_duration_since(at) > window,
    }
}
