//! Dumps an event log to JSON for offline inspection. Not part of the
//! scheduler's own decision-making; a convenience for operators.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;

use crate::domain::entities::event::Event;
use crate::domain::repositories::EventLog;

pub struct JsonHistoryExporter;

impl JsonHistoryExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate<P: AsRef<Path>>(&self, log: &dyn EventLog, path: P) -> Result<()> {
        let json = self.generate_string(log)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn generate_string(&self, log: &dyn EventLog) -> Result<String> {
        let events: Vec<Event> = log.get(None, None, None, None);
        Ok(serde_json::to_string_pretty(&events)?)
    }
}

impl Default for JsonHistoryExporter {
    fn default() -> Self {
        Self::new()
    }
}
