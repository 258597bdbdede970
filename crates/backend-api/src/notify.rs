//! Hazard report notifications

use tracing::info;

use crate::client::ReportReceipt;

/// Invoked once per completed hazard report submission
pub trait ReportNotifier: Send + Sync {
    fn report_sent(&self, hazard_type: &str, receipt: &ReportReceipt);
}

/// Notifier that announces reports through the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReportNotifier;

impl ReportNotifier for LogReportNotifier {
    fn report_sent(&self, hazard_type: &str, receipt: &ReportReceipt) {
        if receipt.success {
            info!(
                "Hazard reported to authorities: {} (ID: {})",
                hazard_type,
                receipt.short_id()
            );
        }
    }
}
