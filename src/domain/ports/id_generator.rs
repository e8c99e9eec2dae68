//! ID generator port - opaque string IDs for every entity the engine mints.

use uuid::Uuid;

/// Mints opaque string IDs, one method per ID kind.
///
/// Hosts with their own ID scheme (prefixed ULIDs, database sequences)
/// implement this; [`UuidIdGenerator`] is the batteries-included default.
pub trait IdGenerator: Send + Sync {
    fn run_id(&self) -> String;
    fn candidate_id(&self) -> String;
    fn tool_use_id(&self) -> String;
    fn message_id(&self) -> String;
}

/// UUID-v4-backed generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn run_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn candidate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn tool_use_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn message_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
