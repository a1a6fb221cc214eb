use presentia_application::{Feedback, FeedbackSeverity, FeedbackSink};

/// Feedback sink that routes operator notifications to the log.
///
/// The kiosk has no toast surface of its own; structured log lines at a
/// severity-matched level are the operator-visible channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedbackSink;

impl FeedbackSink for TracingFeedbackSink {
    fn notify(&self, feedback: Feedback) {
        match feedback.severity {
            FeedbackSeverity::Info | FeedbackSeverity::Success => {
                tracing::info!(title = %feedback.title, detail = %feedback.detail, "notice");
            }
            FeedbackSeverity::Warning => {
                tracing::warn!(title = %feedback.title, detail = %feedback.detail, "notice");
            }
            FeedbackSeverity::Error => {
                tracing::error!(title = %feedback.title, detail = %feedback.detail, "notice");
            }
        }
    }
}
