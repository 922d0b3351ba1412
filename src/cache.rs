use alloc::{boxed::Box, collections::BTreeMap};

use crate::{registry::Slot, service::BoxCloneProvide, subject::Subject};

/// A single wiring: the subject plus the provider strategy chosen for it.
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) subject: Subject,
    pub(crate) provider: BoxCloneProvide,
    pub(crate) constructable: bool,
    pub(crate) slot: Slot,
}

#[derive(Default)]
pub(crate) struct Cache {
    map: BTreeMap<Box<str>, Registration>,
}

impl Cache {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self { map: BTreeMap::new() }
    }

    #[inline]
    pub(crate) fn insert(&mut self, key: Box<str>, registration: Registration) {
        self.map.insert(key, registration);
    }

    #[inline]
    #[must_use]
    pub(crate) fn get_cloned(&self, key: &str) -> Option<Registration> {
        self.map.get(key).cloned()
    }

    #[inline]
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    #[inline]
    #[must_use]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Swaps the stored subject after a deferred load. Provider, flag and slot
    /// stay as wired.
    pub(crate) fn replace_subject(&mut self, key: &str, subject: Subject) {
        if let Some(registration) = self.map.get_mut(key) {
            registration.subject = subject;
        }
    }
}
