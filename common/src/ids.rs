//! Id generation and timestamp conventions shared across the fabric.
//!
//! Ids mirror the `f"msg-{uuid4().hex}"` style of the system this was
//! distilled from: a short literal prefix plus a hex-encoded v4 UUID, so logs
//! stay greppable by entity kind.

use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

fn hex_uuid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn new_agent_id() -> String {
    format!("agent-{}", hex_uuid())
}

pub fn new_message_id() -> String {
    format!("msg-{}", hex_uuid())
}

pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
