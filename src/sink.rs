//! # Sensor Sinks
//!
//! Destinations for the events the dispatcher produces. The driver loop in
//! [`crate::runner`] hands every event to a [`SensorSink`] and republishes the
//! full snapshot on each tick, so a consumer that only keeps the latest value
//! per channel sees stale channels reported as missing.

use std::io::Write;

use chrono::{SecondsFormat, Utc};

use crate::error::DsmrError;
use crate::registry::{SensorEvent, SensorState};

pub trait SensorSink {
    /// Deliver one event
    fn publish(&mut self, event: &SensorEvent) -> Result<(), DsmrError>;

    /// Deliver the state of every channel; called once per tick
    fn publish_snapshot(&mut self, _states: &[SensorState]) -> Result<(), DsmrError> {
        Ok(())
    }
}

/// Writes events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SensorSink for LogSink {
    fn publish(&mut self, event: &SensorEvent) -> Result<(), DsmrError> {
        match event {
            SensorEvent::Value {
                channel,
                code,
                value,
                unit,
            } => log::info!("{channel} ({code}) = {value} {unit}"),
            SensorEvent::Stale {
                channel,
                stale: true,
            } => log::warn!("{channel} is stale"),
            SensorEvent::Stale {
                channel,
                stale: false,
            } => log::info!("{channel} is valid again"),
        }
        Ok(())
    }

    fn publish_snapshot(&mut self, states: &[SensorState]) -> Result<(), DsmrError> {
        for state in states {
            match state.value {
                Some(value) => log::debug!("{} = {value} {}", state.channel, state.unit),
                None => log::debug!("{} = NaN", state.channel),
            }
        }
        Ok(())
    }
}

/// One JSON object per event and line, stamped with the UTC time it was written
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    snapshots: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            snapshots: false,
        }
    }

    /// Also write one `snapshot` object per tick
    pub fn with_snapshots(mut self, enabled: bool) -> Self {
        self.snapshots = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, mut value: serde_json::Value) -> Result<(), DsmrError> {
        value["timestamp"] = serde_json::Value::String(timestamp());
        serde_json::to_writer(&mut self.writer, &value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> SensorSink for JsonLinesSink<W> {
    fn publish(&mut self, event: &SensorEvent) -> Result<(), DsmrError> {
        let value = serde_json::to_value(event)?;
        self.write_line(value)
    }

    fn publish_snapshot(&mut self, states: &[SensorState]) -> Result<(), DsmrError> {
        if !self.snapshots {
            return Ok(());
        }
        let sensors = serde_json::to_value(states)?;
        let value = serde_json::json!({ "event": "snapshot", "sensors": sensors });
        self.write_line(value)
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Keeps everything it receives
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub events: Vec<SensorEvent>,
    pub snapshots: Vec<Vec<SensorState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values published for `channel`, oldest first
    pub fn values_for(&self, channel: &str) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SensorEvent::Value { channel: c, value, .. } if c.name() == channel => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn last_snapshot(&self) -> Option<&[SensorState]> {
        self.snapshots.last().map(Vec::as_slice)
    }
}

impl SensorSink for MemorySink {
    fn publish(&mut self, event: &SensorEvent) -> Result<(), DsmrError> {
        self.events.push(event.clone());
        Ok(())
    }

    fn publish_snapshot(&mut self, states: &[SensorState]) -> Result<(), DsmrError> {
        self.snapshots.push(states.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Channel;

    fn value_event() -> SensorEvent {
        SensorEvent::Value {
            channel: Channel::new("power"),
            code: "1-0:1.7.0".into(),
            value: 1.193,
            unit: "kW".into(),
        }
    }

    #[test]
    fn test_json_lines_format() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.publish(&value_event()).unwrap();
        sink.publish(&SensorEvent::Stale {
            channel: Channel::new("power"),
            stale: true,
        })
        .unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "value");
        assert_eq!(first["code"], "1-0:1.7.0");
        assert_eq!(first["value"], 1.193);
        let ts = first["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "stale");
        assert_eq!(second["stale"], true);
    }

    #[test]
    fn test_json_snapshots_opt_in() {
        let state = SensorState {
            channel: Channel::new("power"),
            code: "1-0:1.7.0".into(),
            value: None,
            unit: String::new(),
            stale: true,
        };

        let mut sink = JsonLinesSink::new(Vec::new());
        sink.publish_snapshot(std::slice::from_ref(&state)).unwrap();
        assert!(sink.into_inner().is_empty());

        let mut sink = JsonLinesSink::new(Vec::new()).with_snapshots(true);
        sink.publish_snapshot(&[state]).unwrap();
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let json: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(json["event"], "snapshot");
        assert!(json["sensors"][0]["value"].is_null());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.publish(&value_event()).unwrap();
        assert_eq!(sink.values_for("power"), vec![1.193]);
        assert!(sink.values_for("energy").is_empty());
        assert!(sink.last_snapshot().is_none());
    }
}
