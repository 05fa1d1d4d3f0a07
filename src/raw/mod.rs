mod entry;
mod utils;

pub use entry::Entry;

use std::borrow::Borrow;
use std::collections::hash_map::{self, HashMap};
use std::hash::{BuildHasher, Hash};
use std::sync::Mutex;

use self::utils::{lock, trace, Shared};

/// The directory of a wait map.
///
/// Every key ever referenced by a read or a write owns an entry in the directory. Entries
/// are heap allocated and never removed while the map is alive, so references to them can
/// outlive the directory lock. All blocking happens on the entries themselves; the
/// directory lock is only held for single lookups and insertions.
pub struct WaitMap<K, V, S> {
    directory: Mutex<HashMap<K, Shared<Entry<V>>, S>>,
}

// Safety: Moving the map by value means nothing borrows it, so no other thread holds a
// reference to an entry or its value. Values are only shared across threads through
// `&WaitMap`, which still requires `V: Sync` through `Shared`.
unsafe impl<K: Send, V: Send, S: Send> Send for WaitMap<K, V, S> {}

impl<K, V, S> WaitMap<K, V, S> {
    /// Creates a new directory with the given capacity and hasher.
    #[inline]
    pub fn new(capacity: usize, hasher: S) -> WaitMap<K, V, S> {
        WaitMap {
            directory: Mutex::new(HashMap::with_capacity_and_hasher(capacity, hasher)),
        }
    }

    /// Returns the number of entries in the directory, pending or ready.
    #[inline]
    pub fn len(&self) -> usize {
        lock(&self.directory).len()
    }

    /// Returns a snapshot of every key and its entry.
    ///
    /// Keys are cloned as the directory may move them once the lock is released.
    pub fn entries(&self) -> Vec<(K, &Entry<V>)>
    where
        K: Clone,
    {
        lock(&self.directory)
            .iter()
            // Safety: Entries are never removed from the directory while `self` is borrowed.
            .map(|(key, entry)| (key.clone(), unsafe { entry.detach() }))
            .collect()
    }
}

impl<K, V, S> WaitMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns the entry for the given key, inserting a pending entry if it is absent.
    pub fn entry(&self, key: K) -> &Entry<V> {
        let mut directory = lock(&self.directory);

        let entry = directory.entry(key).or_insert_with(|| {
            trace!("inserting pending entry");
            Shared::from(Entry::pending())
        });

        // Safety: Entries are never removed from the directory while `self` is borrowed.
        unsafe { entry.detach() }
    }

    /// Returns the entry for the given key, if one exists.
    pub fn find<Q>(&self, key: &Q) -> Option<&Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let directory = lock(&self.directory);

        // Safety: Entries are never removed from the directory while `self` is borrowed.
        directory.get(key).map(|entry| unsafe { entry.detach() })
    }

    /// Returns `true` if the given key has a published value.
    ///
    /// The readiness check is made under the directory lock.
    pub fn is_ready<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        lock(&self.directory)
            .get(key)
            .is_some_and(|entry| entry.is_ready())
    }

    /// Publishes a value for the given key, waking any readers blocked on it.
    ///
    /// Returns `false`, dropping the value, if the key already has a value or another
    /// publisher is in the middle of writing one.
    pub fn publish(&self, key: K, value: V) -> bool {
        let mut directory = lock(&self.directory);

        let entry = match directory.entry(key) {
            // No one can be waiting on a key without an entry, so the value can be
            // inserted as-is.
            hash_map::Entry::Vacant(vacant) => {
                trace!("inserting ready entry");
                vacant.insert(Shared::from(Entry::ready(value)));
                return true;
            }

            // Safety: Entries are never removed from the directory while `self` is borrowed.
            hash_map::Entry::Occupied(occupied) => unsafe { occupied.get().detach() },
        };

        // Claim the entry before releasing the directory lock. Any other publisher that
        // finds the entry after this point will see the claim and back off.
        let claim = entry.claim();
        drop(directory);

        match claim {
            Some(claim) => {
                claim.publish(value);
                true
            }
            None => false,
        }
    }
}
