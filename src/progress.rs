/// Receives progress of long-running pixel work.
pub trait ProgressSink {
    fn start(&mut self, label: &str);
    /// `fraction` is in `0.0..=1.0`.
    fn update(&mut self, fraction: f64);
    fn end(&mut self);
}

const REPORT_STEP_PERCENT: u8 = 10;

/// Logs progress through `tracing`, one event per ten percent.
#[derive(Debug, Default)]
pub struct TracingProgress {
    label: Option<String>,
    last_percent: Option<u8>,
}

impl TracingProgress {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }
}

impl ProgressSink for TracingProgress {
    fn start(&mut self, label: &str) {
        tracing::info!(label, "progress started");
        self.label = Some(label.to_string());
        self.last_percent = Some(0);
    }

    fn update(&mut self, fraction: f64) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8;
        let due = match self.last_percent {
            Some(last) => percent >= last.saturating_add(REPORT_STEP_PERCENT) || (percent == 100 && last < 100),
            None => true,
        };
        if due {
            tracing::debug!(label = self.label.as_deref().unwrap_or(""), percent, "progress");
            self.last_percent = Some(percent);
        }
    }

    fn end(&mut self) {
        tracing::info!(label = self.label.as_deref().unwrap_or(""), "progress finished");
        self.label = None;
        self.last_percent = None;
    }
}
