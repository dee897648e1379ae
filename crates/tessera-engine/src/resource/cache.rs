use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{EngineError, ResourceKind, Result};

/// A cacheable resource with an explicit release hook.
///
/// `Deps` names whatever the hook needs to free the resource (graphics
/// context, message bus, other caches). It is supplied by the caller of
/// [`ResourceCache::release`] because the cache itself owns none of it.
pub trait Resource {
    const KIND: ResourceKind;

    type Deps<'a>;

    /// Frees everything this resource holds outside the cache.
    ///
    /// Called exactly once, when the last reference is released.
    fn destroy(&self, deps: Self::Deps<'_>);
}

/// Result of [`ResourceCache::release`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReleaseOutcome {
    /// References remain; carries the new count.
    Retained(usize),
    /// The last reference was released and the resource destroyed.
    Destroyed,
    /// The name was never registered (or already destroyed). Logged, no-op.
    Unregistered,
}

struct Entry<T> {
    resource: Rc<T>,
    references: usize,
}

/// Name-keyed, reference-counted resource registry.
///
/// Every entry has a count of at least one; the entry is removed and its
/// release hook run in the same call that brings the count to zero.
pub struct ResourceCache<T: Resource> {
    entries: HashMap<String, Entry<T>>,
}

impl<T: Resource> ResourceCache<T> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Inserts `resource` under `name` with one reference.
    ///
    /// The first registration wins: when `name` is already present the
    /// existing entry is kept and `resource` is handed back untouched.
    pub fn register(&mut self, name: &str, resource: T) -> std::result::Result<(), T> {
        if self.entries.contains_key(name) {
            log::debug!("{} '{name}' already registered; keeping existing entry", T::KIND);
            return Err(resource);
        }
        self.entries.insert(
            name.to_string(),
            Entry { resource: Rc::new(resource), references: 1 },
        );
        log::debug!("{} '{name}' registered", T::KIND);
        Ok(())
    }

    /// Takes another reference to `name`.
    pub fn acquire(&mut self, name: &str) -> Result<Rc<T>> {
        let entry = self.entries.get_mut(name).ok_or_else(|| EngineError::ResourceNotFound {
            kind: T::KIND,
            name: name.to_string(),
        })?;
        entry.references += 1;
        Ok(Rc::clone(&entry.resource))
    }

    /// Shared handle without touching the reference count.
    pub fn get(&self, name: &str) -> Option<Rc<T>> {
        self.entries.get(name).map(|e| Rc::clone(&e.resource))
    }

    /// Drops one reference to `name`, destroying the resource at zero.
    pub fn release(&mut self, name: &str, deps: T::Deps<'_>) -> ReleaseOutcome {
        let Some(entry) = self.entries.get_mut(name) else {
            log::warn!("cannot release {} '{name}': it has not been registered", T::KIND);
            return ReleaseOutcome::Unregistered;
        };

        entry.references -= 1;
        if entry.references > 0 {
            return ReleaseOutcome::Retained(entry.references);
        }

        if let Some(entry) = self.entries.remove(name) {
            entry.resource.destroy(deps);
        }
        log::debug!("{} '{name}' destroyed", T::KIND);
        ReleaseOutcome::Destroyed
    }

    pub fn reference_count(&self, name: &str) -> Option<usize> {
        self.entries.get(name).map(|e| e.references)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<T: Resource> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records destroyed names into the log passed as deps.
    #[derive(Debug)]
    struct Tracked(&'static str);

    impl Resource for Tracked {
        const KIND: ResourceKind = ResourceKind::Texture;
        type Deps<'a> = &'a RefCell<Vec<&'static str>>;

        fn destroy(&self, deps: Self::Deps<'_>) {
            deps.borrow_mut().push(self.0);
        }
    }

    #[test]
    fn acquire_after_register_returns_resource_and_counts_two() {
        let mut cache = ResourceCache::new();
        assert!(cache.register("wall", Tracked("wall")).is_ok());

        let r = cache.acquire("wall").unwrap();
        assert_eq!(r.0, "wall");
        assert_eq!(cache.reference_count("wall"), Some(2));
    }

    #[test]
    fn release_twice_from_two_destroys_exactly_once() {
        let destroyed = RefCell::new(Vec::new());
        let mut cache = ResourceCache::new();
        assert!(cache.register("wall", Tracked("wall")).is_ok());
        cache.acquire("wall").unwrap();

        assert_eq!(cache.release("wall", &destroyed), ReleaseOutcome::Retained(1));
        assert!(destroyed.borrow().is_empty());

        assert_eq!(cache.release("wall", &destroyed), ReleaseOutcome::Destroyed);
        assert_eq!(*destroyed.borrow(), vec!["wall"]);
        assert!(!cache.contains("wall"));

        // A further release is a reported no-op, not a second destroy.
        assert_eq!(cache.release("wall", &destroyed), ReleaseOutcome::Unregistered);
        assert_eq!(destroyed.borrow().len(), 1);
    }

    #[test]
    fn first_registration_wins() {
        let destroyed = RefCell::new(Vec::new());
        let mut cache = ResourceCache::new();
        assert!(cache.register("wall", Tracked("first")).is_ok());
        let rejected = cache.register("wall", Tracked("second")).unwrap_err();
        assert_eq!(rejected.0, "second");

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.reference_count("wall"), Some(1));
        assert_eq!(cache.get("wall").unwrap().0, "first");

        cache.release("wall", &destroyed);
        assert_eq!(*destroyed.borrow(), vec!["first"]);
    }

    #[test]
    fn acquire_missing_is_not_found() {
        let mut cache: ResourceCache<Tracked> = ResourceCache::new();
        assert_eq!(
            cache.acquire("ghost").unwrap_err(),
            EngineError::ResourceNotFound { kind: ResourceKind::Texture, name: "ghost".into() }
        );
    }

    #[test]
    fn release_unregistered_is_reported_not_fatal() {
        let destroyed = RefCell::new(Vec::new());
        let mut cache: ResourceCache<Tracked> = ResourceCache::new();
        assert_eq!(cache.release("ghost", &destroyed), ReleaseOutcome::Unregistered);
        assert!(cache.is_empty());
    }
}
