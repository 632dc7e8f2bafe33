//! In-memory pairing credentials.
//!
//! A television issues a token (Samsung) or client key (WebOS) the first
//! time the user approves pairing. Presenting it again skips the on-screen
//! prompt. Credentials live for the life of the process; nothing is
//! written to disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tvlink_protocol::DeviceAddress;

/// Shared map from device address to its current credential.
///
/// Cheap to clone: clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<Mutex<HashMap<DeviceAddress, String>>>,
}

impl CredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the credential stored for `address`.
    pub fn get(&self, address: &DeviceAddress) -> Option<String> {
        self.lock().get(address).cloned()
    }

    /// Stores (or replaces) the credential for `address`.
    pub fn set(&self, address: &DeviceAddress, credential: impl Into<String>) {
        self.lock().insert(address.clone(), credential.into());
    }

    /// Forgets the credential for `address`, returning it if there was one.
    pub fn clear(&self, address: &DeviceAddress) -> Option<String> {
        self.lock().remove(address)
    }

    /// A view of this store that can only touch `address`.
    pub fn slot(&self, address: DeviceAddress) -> CredentialSlot {
        CredentialSlot {
            address,
            store: self.clone(),
        }
    }

    // The map is never left half-updated, so a poisoned lock is still
    // usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceAddress, String>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The credential of exactly one device.
///
/// Each session holds the slot for its own address, so it can't read or
/// overwrite another device's token.
#[derive(Debug, Clone)]
pub struct CredentialSlot {
    address: DeviceAddress,
    store: CredentialStore,
}

impl CredentialSlot {
    /// The address this slot belongs to.
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Returns the current credential.
    pub fn get(&self) -> Option<String> {
        self.store.get(&self.address)
    }

    /// Replaces the credential.
    pub fn set(&self, credential: impl Into<String>) {
        self.store.set(&self.address, credential);
    }

    /// Forgets the credential.
    pub fn clear(&self) -> Option<String> {
        self.store.clear(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get_returns_credential() {
        let store = CredentialStore::new();
        let tv = DeviceAddress::webos("10.0.0.5");
        store.set(&tv, "K1");
        assert_eq!(store.get(&tv).as_deref(), Some("K1"));
    }

    #[test]
    fn test_clear_removes_credential() {
        let store = CredentialStore::new();
        let tv = DeviceAddress::samsung("10.0.0.6");
        store.set(&tv, "T1");
        assert_eq!(store.clear(&tv).as_deref(), Some("T1"));
        assert_eq!(store.get(&tv), None);
    }

    #[test]
    fn test_slot_is_scoped_to_its_address() {
        let store = CredentialStore::new();
        let samsung = DeviceAddress::samsung("10.0.0.7");
        let webos = DeviceAddress::webos("10.0.0.7");

        let slot = store.slot(samsung.clone());
        slot.set("T1");
        store.set(&webos, "K1");

        assert_eq!(slot.get().as_deref(), Some("T1"));
        slot.clear();
        assert_eq!(store.get(&samsung), None);
        assert_eq!(store.get(&webos).as_deref(), Some("K1"));
    }

    #[test]
    fn test_clones_share_state() {
        let store = CredentialStore::new();
        let other = store.clone();
        let tv = DeviceAddress::webos("10.0.0.8");
        other.set(&tv, "K2");
        assert_eq!(store.get(&tv).as_deref(), Some("K2"));
    }
}
