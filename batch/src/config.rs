//! Batch scheduling configuration.

/// Default schedule of the order report: 01:30 UTC daily.
pub const DEFAULT_ORDER_REPORT_CRON: &str = "0 30 1 * * *";
/// Default schedule of the user statistics: 02:00 UTC daily.
pub const DEFAULT_USER_STATISTICS_CRON: &str = "0 0 2 * * *";

/// Which jobs run on a schedule, and when.
///
/// Expressions use six fields with seconds first, evaluated in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Whether the scheduler starts at all.
    ///
    /// Default: true
    pub enabled: bool,

    /// Cron expression for `orderReportJob`.
    pub order_report_cron: String,

    /// Cron expression for `userStatisticsJob`.
    pub user_statistics_cron: String,
}

impl BatchConfig {
    /// Configuration with the default schedules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable scheduling.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the order report schedule.
    #[must_use]
    pub fn with_order_report_cron(mut self, expression: impl Into<String>) -> Self {
        self.order_report_cron = expression.into();
        self
    }

    /// Set the user statistics schedule.
    #[must_use]
    pub fn with_user_statistics_cron(mut self, expression: impl Into<String>) -> Self {
        self.user_statistics_cron = expression.into();
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order_report_cron: DEFAULT_ORDER_REPORT_CRON.to_string(),
            user_statistics_cron: DEFAULT_USER_STATISTICS_CRON.to_string(),
        }
    }
}
