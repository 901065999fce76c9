//! Event sink configuration

/// Event sink configuration
#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Hand `VT_DISPATCH` arguments to handlers as `DispatchProxy` values
    /// instead of raw object references
    pub wrap_object_references: bool,
    /// Report events whose DISPID has no registered callback
    ///
    /// Sources often fire more events than a listener cares about; turning
    /// this off drops those events with a debug log instead.
    pub report_unknown_dispids: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            wrap_object_references: true,
            report_unknown_dispids: true,
        }
    }
}

impl SinkConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wrap_object_references(mut self, wrap: bool) -> Self {
        self.wrap_object_references = wrap;
        self
    }

    pub fn with_report_unknown_dispids(mut self, report: bool) -> Self {
        self.report_unknown_dispids = report;
        self
    }
}
