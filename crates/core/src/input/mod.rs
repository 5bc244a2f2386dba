use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};

use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};

use crate::{MoireError, Result};

#[derive(Debug)]
struct FieldState {
    value: String,
    locked: bool,
    closed: bool,
    next_id: u64,
    pending: Option<Subscription>,
}

#[derive(Debug)]
struct Subscription {
    id: u64,
    sender: oneshot::Sender<String>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<FieldState>,
    unlocked: Notify,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, FieldState>> {
        self.state
            .lock()
            .map_err(|_| MoireError::Poisoned("input field"))
    }
}

impl Default for FieldState {
    fn default() -> Self {
        Self {
            value: String::new(),
            locked: true,
            closed: false,
            next_id: 0,
            pending: None,
        }
    }
}

/// Editable single-line input field with one subscribe-once submit slot.
///
/// The field starts locked. [`InputField::subscribe`] unlocks it and returns
/// a [`LineRequest`] that resolves on the next [`InputHandle::submit`]. At
/// most one request can be outstanding; a second one is rejected with
/// [`MoireError::RequestPending`].
#[derive(Debug, Clone, Default)]
pub struct InputField {
    shared: Arc<Shared>,
}

impl InputField {
    /// Creates a locked, empty field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle used by whatever produces keystrokes.
    pub fn handle(&self) -> InputHandle {
        InputHandle {
            shared: self.shared.clone(),
        }
    }

    /// Returns whether edits are currently refused.
    pub fn is_locked(&self) -> Result<bool> {
        Ok(self.lock()?.locked)
    }

    /// Returns whether a line request is waiting for a submit.
    pub fn is_pending(&self) -> Result<bool> {
        Ok(self.lock()?.pending.is_some())
    }

    /// Returns the current field value.
    pub fn value(&self) -> Result<String> {
        Ok(self.lock()?.value.clone())
    }

    pub(crate) fn set_locked(&self, locked: bool) -> Result<()> {
        self.lock()?.locked = locked;
        Ok(())
    }

    /// Unlocks the field and waits for the next submitted line.
    pub fn subscribe(&self) -> Result<LineRequest> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(MoireError::InputClosed);
        }
        if let Some(pending) = &state.pending {
            if !pending.sender.is_closed() {
                warn!("rejecting line request while another is pending");
                return Err(MoireError::RequestPending);
            }
        }

        let (sender, receiver) = oneshot::channel();
        let id = state.next_id;
        state.next_id += 1;
        state.pending = Some(Subscription { id, sender });
        state.locked = false;
        drop(state);
        self.shared.unlocked.notify_waiters();
        debug!(id, "line request subscribed");

        Ok(LineRequest {
            id,
            receiver,
            shared: self.shared.clone(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, FieldState>> {
        self.shared.lock()
    }
}

/// External side of an [`InputField`]: edits the value and fires submit.
#[derive(Debug, Clone)]
pub struct InputHandle {
    shared: Arc<Shared>,
}

impl InputHandle {
    /// Replaces the field value. Returns `false` when the field is locked.
    pub fn set_value(&self, value: impl Into<String>) -> Result<bool> {
        let mut state = self.lock()?;
        if state.locked {
            return Ok(false);
        }
        state.value = value.into();
        Ok(true)
    }

    /// Appends to the field value. Returns `false` when the field is locked.
    pub fn push_str(&self, text: &str) -> Result<bool> {
        let mut state = self.lock()?;
        if state.locked {
            return Ok(false);
        }
        state.value.push_str(text);
        Ok(true)
    }

    /// Returns whether edits are currently refused.
    pub fn is_locked(&self) -> Result<bool> {
        Ok(self.lock()?.locked)
    }

    /// Waits until a line request unlocks the field. Fails with
    /// [`MoireError::InputClosed`] once the field is closed.
    pub async fn wait_unlocked(&self) -> Result<()> {
        loop {
            let notified = self.shared.unlocked.notified();
            {
                let state = self.lock()?;
                if state.closed {
                    return Err(MoireError::InputClosed);
                }
                if !state.locked {
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    /// Fires the submit signal.
    ///
    /// Delivers the current value to the pending request, clears the field
    /// and locks it again. Returns the delivered line, or `None` when nobody
    /// was waiting.
    pub fn submit(&self) -> Result<Option<String>> {
        let mut state = self.lock()?;
        let Some(subscription) = state.pending.take() else {
            debug!("submit ignored, no pending line request");
            return Ok(None);
        };

        let line = std::mem::take(&mut state.value);
        state.locked = true;
        match subscription.sender.send(line.clone()) {
            Ok(()) => {
                debug!(id = subscription.id, "line submitted");
                Ok(Some(line))
            }
            Err(_) => Ok(None),
        }
    }

    /// Closes the field for good; a pending request resolves with
    /// [`MoireError::InputClosed`].
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.closed = true;
        state.locked = true;
        state.pending = None;
        drop(state);
        self.shared.unlocked.notify_waiters();
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, FieldState>> {
        self.shared.lock()
    }
}

/// One-shot future resolving with the next submitted line.
///
/// Dropping an unresolved request unsubscribes it and re-locks the field.
#[derive(Debug)]
pub struct LineRequest {
    id: u64,
    receiver: oneshot::Receiver<String>,
    shared: Arc<Shared>,
}

impl Future for LineRequest {
    type Output = Result<String>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.map_err(|_| MoireError::InputClosed))
    }
}

impl Drop for LineRequest {
    fn drop(&mut self) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if state.pending.as_ref().map(|sub| sub.id) == Some(self.id) {
            state.pending = None;
            state.locked = true;
            debug!(id = self.id, "line request cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_starts_locked_and_ignores_edits() {
        let field = InputField::new();
        let handle = field.handle();

        assert!(field.is_locked().unwrap());
        assert!(!handle.set_value("ignored").unwrap());
        assert_eq!(field.value().unwrap(), "");
        assert_eq!(handle.submit().unwrap(), None);
    }

    #[tokio::test]
    async fn submit_resolves_request_and_relocks() {
        let field = InputField::new();
        let handle = field.handle();

        let request = field.subscribe().unwrap();
        assert!(!field.is_locked().unwrap());
        assert!(handle.set_value("hel").unwrap());
        assert!(handle.push_str("lo").unwrap());

        assert_eq!(handle.submit().unwrap().as_deref(), Some("hello"));
        assert_eq!(request.await.unwrap(), "hello");
        assert!(field.is_locked().unwrap());
        assert_eq!(field.value().unwrap(), "");
    }

    #[test]
    fn concurrent_request_is_rejected() {
        let field = InputField::new();
        let _first = field.subscribe().unwrap();

        let err = field.subscribe().unwrap_err();
        assert!(matches!(err, MoireError::RequestPending));
    }

    #[test]
    fn dropping_request_unsubscribes() {
        let field = InputField::new();
        let handle = field.handle();

        let request = field.subscribe().unwrap();
        drop(request);

        assert!(!field.is_pending().unwrap());
        assert!(field.is_locked().unwrap());
        assert_eq!(handle.submit().unwrap(), None);
        assert!(field.subscribe().is_ok());
    }

    #[test]
    fn stale_request_drop_leaves_new_subscription_alone() {
        let field = InputField::new();
        let handle = field.handle();

        let first = field.subscribe().unwrap();
        handle.submit().unwrap();
        let _second = field.subscribe().unwrap();
        drop(first);

        assert!(field.is_pending().unwrap());
        assert!(!field.is_locked().unwrap());
    }

    #[tokio::test]
    async fn close_fails_pending_request() {
        let field = InputField::new();
        let request = field.subscribe().unwrap();

        field.handle().close().unwrap();

        assert!(matches!(request.await, Err(MoireError::InputClosed)));
        assert!(matches!(field.subscribe(), Err(MoireError::InputClosed)));
    }

    #[tokio::test]
    async fn waiting_writer_wakes_when_a_request_unlocks() {
        let field = InputField::new();
        let handle = field.handle();

        let writer = tokio::spawn({
            let handle = handle.clone();
            async move {
                handle.wait_unlocked().await.unwrap();
                assert!(handle.set_value("typed").unwrap());
                handle.submit().unwrap()
            }
        });
        tokio::task::yield_now().await;
        assert!(!writer.is_finished());

        let request = field.subscribe().unwrap();
        assert_eq!(request.await.unwrap(), "typed");
        assert_eq!(writer.await.unwrap().as_deref(), Some("typed"));
    }

    #[tokio::test]
    async fn waiting_writer_fails_once_closed() {
        let field = InputField::new();
        let handle = field.handle();

        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.wait_unlocked().await }
        });
        tokio::task::yield_now().await;
        handle.close().unwrap();

        assert!(matches!(
            waiter.await.unwrap(),
            Err(MoireError::InputClosed)
        ));
    }
}
