//! Notification and escalation channel collaborator.
//!
//! Fire-and-forget from the core's perspective: send failures are logged
//! by callers and never retried here. Subjects only ever see the
//! user-facing notice; internal scoring detail stays internal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Priority attached to operator alerts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
            AlertPriority::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// Errors from the notification backend.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Outbound notification contract.
#[async_trait]
pub trait NotificationChannel: Send + Sync + 'static {
    /// Sends a structured alert to the operator channel.
    async fn send_admin_alert(
        &self,
        alert_type: &str,
        data: serde_json::Value,
        priority: AlertPriority,
    ) -> Result<(), NotifyError>;

    /// Sends a user-facing security notice to a subject.
    async fn send_security_notification(
        &self,
        subject_id: &str,
        notice_type: &str,
        details: &str,
    ) -> Result<(), NotifyError>;
}

/// Default channel: structured logs only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationChannel for LogNotifier {
    async fn send_admin_alert(
        &self,
        alert_type: &str,
        data: serde_json::Value,
        priority: AlertPriority,
    ) -> Result<(), NotifyError> {
        info!(alert_type, %priority, %data, "admin alert");
        Ok(())
    }

    async fn send_security_notification(
        &self,
        subject_id: &str,
        notice_type: &str,
        details: &str,
    ) -> Result<(), NotifyError> {
        info!(subject_id, notice_type, details, "security notification");
        Ok(())
    }
}

/// Test channel that records every send.
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// One captured admin alert.
    #[derive(Debug, Clone)]
    pub struct CapturedAlert {
        pub alert_type: String,
        pub data: serde_json::Value,
        pub priority: AlertPriority,
    }

    /// One captured subject notification.
    #[derive(Debug, Clone)]
    pub struct CapturedNotice {
        pub subject_id: String,
        pub notice_type: String,
        pub details: String,
    }

    /// A `NotificationChannel` that captures sends for assertions.
    #[derive(Debug, Default)]
    pub struct CapturingNotifier {
        pub alerts: Mutex<Vec<CapturedAlert>>,
        pub notices: Mutex<Vec<CapturedNotice>>,
        pub fail_sends: bool,
    }

    impl CapturingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// A notifier whose sends always fail.
        pub fn failing() -> Self {
            Self {
                fail_sends: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl NotificationChannel for CapturingNotifier {
        async fn send_admin_alert(
            &self,
            alert_type: &str,
            data: serde_json::Value,
            priority: AlertPriority,
        ) -> Result<(), NotifyError> {
            if self.fail_sends {
                return Err(NotifyError::Unavailable("test".to_string()));
            }
            self.alerts.lock().await.push(CapturedAlert {
                alert_type: alert_type.to_string(),
                data,
                priority,
            });
            Ok(())
        }

        async fn send_security_notification(
            &self,
            subject_id: &str,
            notice_type: &str,
            details: &str,
        ) -> Result<(), NotifyError> {
            if self.fail_sends {
                return Err(NotifyError::SendFailed("test".to_string()));
            }
            self.notices.lock().await.push(CapturedNotice {
                subject_id: subject_id.to_string(),
                notice_type: notice_type.to_string(),
                details: details.to_string(),
            });
            Ok(())
        }
    }
}
