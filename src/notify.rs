//! Outbound customer notifications.
//!
//! Delivery is fire-and-forget: each notification is attempted at most once on
//! a blocking worker and failures are only logged.

use std::{fmt, sync::Arc};

use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    AccountCreated { user_id: Uuid, email: String },
    OrderPlaced { order_id: Uuid, owner_id: Uuid },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::AccountCreated { email, .. } => {
                write!(f, "Your account has been created ({email})")
            }
            Notification::OrderPlaced { order_id, .. } => {
                write!(f, "Order {order_id} has been placed")
            }
        }
    }
}

pub trait Notifier: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of sending them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(?notification, "{notification}");
        Ok(())
    }
}

/// Hands the notification to a blocking worker and returns at once. The
/// handle resolves after the single delivery attempt; callers may drop it.
pub fn dispatch(notifier: &Arc<dyn Notifier>, notification: Notification) -> JoinHandle<()> {
    let notifier = Arc::clone(notifier);
    tokio::task::spawn_blocking(move || {
        if let Err(err) = notifier.deliver(&notification) {
            tracing::warn!(error = %err, ?notification, "notification failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl Notifier for Recorder {
        fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Failing(AtomicUsize);

    impl Notifier for Failing {
        fn deliver(&self, _: &Notification) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("smtp unavailable")
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let recorder = Arc::new(Recorder::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();
        let order_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();

        dispatch(&notifier, Notification::OrderPlaced { order_id, owner_id })
            .await
            .expect("delivery task");

        assert_eq!(
            recorder.0.lock().unwrap().as_slice(),
            &[Notification::OrderPlaced { order_id, owner_id }]
        );
    }

    #[tokio::test]
    async fn failed_delivery_is_attempted_once_and_swallowed() {
        let failing = Arc::new(Failing::default());
        let notifier: Arc<dyn Notifier> = failing.clone();

        let outcome = dispatch(
            &notifier,
            Notification::AccountCreated {
                user_id: Uuid::new_v4(),
                email: "a@example.com".into(),
            },
        )
        .await;

        assert!(outcome.is_ok(), "delivery task must not panic");
        assert_eq!(failing.0.load(Ordering::SeqCst), 1);
    }
}
