use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    Debug,
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub level: TraceLevel,
    pub line: String,
}

/// Bounded diagnostic log. Every accepted line is also forwarded to
/// `tracing` so a host subscriber sees the same stream.
#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) min_level: TraceLevel,
    pub(crate) logs: VecDeque<TraceEntry>,
    pub(crate) log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: true,
            min_level: TraceLevel::Info,
            logs: VecDeque::new(),
            log_limit: 10_000,
        }
    }
}

impl TraceState {
    pub(crate) fn record(&mut self, level: TraceLevel, line: String) {
        match level {
            TraceLevel::Debug => tracing::debug!(target: "doxydochub_viewer", "{line}"),
            TraceLevel::Info => tracing::info!(target: "doxydochub_viewer", "{line}"),
            TraceLevel::Warn => tracing::warn!(target: "doxydochub_viewer", "{line}"),
        }
        if !self.enabled || level < self.min_level {
            return;
        }
        if self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(TraceEntry { level, line });
    }

    pub(crate) fn debug(&mut self, line: String) {
        self.record(TraceLevel::Debug, line);
    }

    pub(crate) fn info(&mut self, line: String) {
        self.record(TraceLevel::Info, line);
    }

    pub(crate) fn warn(&mut self, line: String) {
        self.record(TraceLevel::Warn, line);
    }

    pub(crate) fn set_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "trace log limit requires at least 1 entry".into(),
            ));
        }
        self.log_limit = max_entries;
        while self.logs.len() > self.log_limit {
            self.logs.pop_front();
        }
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Vec<TraceEntry> {
        self.logs.drain(..).collect()
    }
}
