//! # Request Context
//!
//! Per-call identity carried into every Inventory mutation and attached to
//! its tracing span.
//!
//! ```text
//! inventory{request_id=5b0c… actor=Some("clerk-7") op="record_movement"}
//!   └─ Inserting movement item_id=… movement_type=outbound quantity=3
//!   └─ Persisting balance item_id=… available=7
//! ```

use uuid::Uuid;

/// Identity of one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,

    /// Who issued the request, when known.
    pub actor: Option<String>,
}

impl RequestContext {
    /// A context with a fresh request id and no actor.
    pub fn new() -> Self {
        RequestContext {
            request_id: Uuid::new_v4(),
            actor: None,
        }
    }

    pub fn with_actor(actor: impl Into<String>) -> Self {
        RequestContext {
            request_id: Uuid::new_v4(),
            actor: Some(actor.into()),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
