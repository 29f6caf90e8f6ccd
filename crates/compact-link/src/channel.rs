//! Transport seam towards the watch.

use std::future::Future;

use parking_lot::Mutex;
use thiserror::Error;

use crate::dict::MessageError;
use crate::message::OutboundMessage;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Watch rejected the message: {0}")]
    Rejected(String),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request/response channel to the watch. A successful return means the
/// watch acknowledged the message.
pub trait DeviceChannel: Send + Sync {
    fn send(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Records every message and acknowledges it unless told to reject.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    sent: Mutex<Vec<OutboundMessage>>,
    reject: Mutex<Option<String>>,
    inbox_size: Option<usize>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also enforce the watch's inbox size when accepting messages
    pub fn with_inbox_size(inbox_size: usize) -> Self {
        Self {
            inbox_size: Some(inbox_size),
            ..Self::default()
        }
    }

    /// Reject every following message with `reason`; `None` accepts again
    pub fn set_reject(&self, reason: Option<&str>) {
        *self.reject.lock() = reason.map(str::to_string);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_of_kind(&self, kind: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.kind() == kind)
            .cloned()
            .collect()
    }
}

impl DeviceChannel for MemoryChannel {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        if let Some(limit) = self.inbox_size {
            message.encode(limit)?;
        }
        if let Some(reason) = self.reject.lock().clone() {
            return Err(DeliveryError::Rejected(reason));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }
}
