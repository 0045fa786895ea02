//! Best-effort audit trail of reservation attempts.
//!
//! The booking path hands events to a bounded channel and moves on. A single
//! background worker turns them into [`AuditLogEntry`] rows. Nothing here can
//! fail, delay or roll back a booking: a full channel drops the event, a failed
//! write is logged and forgotten.

use chrono::{DateTime, Utc};
use seatline_shared::models::events::{AttemptStatus, FailureKind, ReservationAttemptedEvent};
use seatline_shared::Masked;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::repository::AuditStore;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub flight_id: Uuid,
    pub passenger_email: String,
    pub requested_seats: i32,
    pub available_before: Option<i32>,
    pub status: AttemptStatus,
    pub failure_kind: Option<FailureKind>,
    pub error_message: Option<String>,
    pub reservation_id: Option<Uuid>,
}

impl From<ReservationAttemptedEvent> for AuditLogEntry {
    fn from(event: ReservationAttemptedEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: event.occurred_at,
            flight_id: event.flight_id,
            passenger_email: event.passenger_email,
            requested_seats: event.requested_seats,
            available_before: event.available_before,
            status: event.status,
            failure_kind: event.failure_kind,
            error_message: event.error_message,
            reservation_id: event.reservation_id,
        }
    }
}

/// Sending half of the audit channel. Cheap to clone.
#[derive(Clone)]
pub struct AuditPipeline {
    tx: mpsc::Sender<ReservationAttemptedEvent>,
}

/// Handle on the background writer.
pub struct AuditWorker {
    handle: JoinHandle<()>,
}

impl AuditPipeline {
    /// Starts the writer task on the current tokio runtime.
    pub fn spawn(store: Arc<dyn AuditStore>, capacity: usize) -> (Self, AuditWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(store, rx));
        (Self { tx }, AuditWorker { handle })
    }

    /// Queues an event without waiting. Never fails the caller.
    pub fn emit(&self, event: ReservationAttemptedEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                error!(
                    flight_id = %event.flight_id,
                    status = %event.status,
                    "Audit channel full, dropping audit record"
                );
            }
            Err(TrySendError::Closed(event)) => {
                error!(
                    flight_id = %event.flight_id,
                    status = %event.status,
                    "Audit worker stopped, dropping audit record"
                );
            }
        }
    }
}

impl AuditWorker {
    /// Waits for the worker to drain the channel. Completes once every
    /// [`AuditPipeline`] clone has been dropped.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!("Audit worker terminated abnormally: {}", e);
        }
    }
}

async fn run_worker(store: Arc<dyn AuditStore>, mut rx: mpsc::Receiver<ReservationAttemptedEvent>) {
    info!("Audit worker started");
    while let Some(event) = rx.recv().await {
        let entry = AuditLogEntry::from(event);
        match store.save(&entry).await {
            Ok(()) => info!(
                flight_id = %entry.flight_id,
                passenger = %Masked(&entry.passenger_email),
                status = %entry.status,
                "Audit log written for reservation attempt"
            ),
            Err(e) => error!(
                flight_id = %entry.flight_id,
                status = %entry.status,
                "Failed to write audit log: {}", e
            ),
        }
    }
    info!("Audit worker stopped");
}
