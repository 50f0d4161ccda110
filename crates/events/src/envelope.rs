use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_core::TenantId;

use crate::Event;

/// Envelope for a published event: tenant + routing metadata around the payload.
///
/// Tenant scoping lives here rather than in each payload so subscribers can
/// filter without decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        tenant_id: TenantId,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            tenant_id,
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap a typed event, taking type and time from the event itself.
    pub fn wrap(tenant_id: TenantId, event: E) -> Self {
        Self::new(
            Uuid::now_v7(),
            tenant_id,
            event.event_type(),
            event.occurred_at(),
            event,
        )
    }
}
