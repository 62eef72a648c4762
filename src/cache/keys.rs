//! Key generation for stored values.

use uuid::Uuid;

/// Produces the opaque keys handed back by `set`.
///
/// Implementations must not repeat a key while it may still be live.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random 128-bit UUID v4 keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeys;

impl KeyGenerator for UuidKeys {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
