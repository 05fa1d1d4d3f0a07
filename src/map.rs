use crate::raw;

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

/// A concurrent, write-once hash map whose readers block until a value is published.
///
/// Each key holds at most one value for the lifetime of the map. [`WaitMap::get`] returns
/// the value for a key, blocking the current thread until some other thread publishes it
/// with [`WaitMap::set`]. See the [crate-level documentation](crate) for details.
///
/// A map can be moved to another thread whenever its keys, values and hasher can. Sharing
/// it between threads also requires `V: Sync`, as readers borrow values directly:
///
/// ```compile_fail
/// use waitmap::WaitMap;
/// use std::cell::Cell;
///
/// fn assert_sync<T: Sync>(_: &T) {}
///
/// let map: WaitMap<usize, Cell<u32>> = WaitMap::new();
/// assert_sync(&map);
/// ```
pub struct WaitMap<K, V, S = RandomState> {
    raw: raw::WaitMap<K, V, S>,
}

/// A builder for a [`WaitMap`].
///
/// # Examples
///
/// ```rust
/// use waitmap::WaitMap;
/// use std::collections::hash_map::RandomState;
///
/// let map: WaitMap<i32, i32> = WaitMap::builder()
///     // Set the initial capacity.
///     .capacity(2048)
///     // Set the hasher.
///     .hasher(RandomState::new())
///     // Construct the wait map.
///     .build();
/// ```
pub struct WaitMapBuilder<K, V, S = RandomState> {
    hasher: S,
    capacity: usize,
    _kv: PhantomData<(K, V)>,
}

impl<K, V> WaitMapBuilder<K, V> {
    /// Set the hash builder used to hash keys.
    ///
    /// Warning: `hash_builder` is normally randomly generated, and is designed
    /// to allow maps to be resistant to attacks that cause many collisions
    /// and very poor performance. Setting it manually using this function can
    /// expose a DoS attack vector.
    pub fn hasher<S>(self, hasher: S) -> WaitMapBuilder<K, V, S> {
        WaitMapBuilder {
            hasher,
            capacity: self.capacity,
            _kv: PhantomData,
        }
    }
}

impl<K, V, S> WaitMapBuilder<K, V, S> {
    /// Set the initial capacity of the map.
    ///
    /// The map should be able to hold at least `capacity` keys, pending or ready,
    /// before resizing its directory.
    pub fn capacity(self, capacity: usize) -> WaitMapBuilder<K, V, S> {
        WaitMapBuilder {
            capacity,
            hasher: self.hasher,
            _kv: PhantomData,
        }
    }

    /// Build a [`WaitMap`] with the provided configuration.
    pub fn build(self) -> WaitMap<K, V, S> {
        WaitMap {
            raw: raw::WaitMap::new(self.capacity, self.hasher),
        }
    }
}

impl<K, V, S> fmt::Debug for WaitMapBuilder<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitMapBuilder")
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<K, V> WaitMap<K, V> {
    /// Creates an empty `WaitMap`.
    ///
    /// The map is initially created with a capacity of 0, so it will not allocate until a
    /// key is first referenced.
    ///
    /// # Examples
    ///
    /// ```
    /// use waitmap::WaitMap;
    /// let map: WaitMap<&str, i32> = WaitMap::new();
    /// ```
    pub fn new() -> WaitMap<K, V> {
        WaitMap::with_capacity_and_hasher(0, RandomState::new())
    }

    /// Creates an empty `WaitMap` with the specified capacity.
    ///
    /// The map should be able to hold at least `capacity` keys before resizing.
    ///
    /// # Examples
    ///
    /// ```
    /// use waitmap::WaitMap;
    /// let map: WaitMap<&str, i32> = WaitMap::with_capacity(10);
    /// ```
    pub fn with_capacity(capacity: usize) -> WaitMap<K, V> {
        WaitMap::with_capacity_and_hasher(capacity, RandomState::new())
    }

    /// Returns a builder for a `WaitMap`.
    ///
    /// The builder can be used for more complex configuration, such as using
    /// a custom hasher.
    pub fn builder() -> WaitMapBuilder<K, V> {
        WaitMapBuilder {
            capacity: 0,
            hasher: RandomState::default(),
            _kv: PhantomData,
        }
    }
}

impl<K, V, S> Default for WaitMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        WaitMap::with_hasher(S::default())
    }
}

impl<K, V, S> WaitMap<K, V, S> {
    /// Creates an empty `WaitMap` which will use the given hash builder to hash keys.
    pub fn with_hasher(hash_builder: S) -> WaitMap<K, V, S> {
        WaitMap::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates an empty `WaitMap` with at least the specified capacity, using
    /// `hash_builder` to hash the keys.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> WaitMap<K, V, S> {
        WaitMap {
            raw: raw::WaitMap::new(capacity, hash_builder),
        }
    }

    /// Returns the number of keys in the map, including keys that readers are still
    /// waiting on.
    ///
    /// # Examples
    ///
    /// ```
    /// use waitmap::WaitMap;
    ///
    /// let map = WaitMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.set(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if no key has ever been referenced.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V, S> WaitMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns the value for the given key, blocking until one is published.
    ///
    /// If the key has no value yet, the current thread is blocked until another thread
    /// calls [`set`](WaitMap::set) for the same key. A key that is never set blocks its
    /// readers forever. Bounded waits must be layered on top by the caller.
    ///
    /// If the key is already published this returns immediately without blocking.
    ///
    /// # Examples
    ///
    /// ```
    /// use waitmap::WaitMap;
    /// use std::thread;
    ///
    /// let map = WaitMap::new();
    ///
    /// thread::scope(|s| {
    ///     let reader = s.spawn(|| *map.get("x"));
    ///     map.set("x", 42);
    ///     assert_eq!(reader.join().unwrap(), 42);
    /// });
    /// ```
    #[inline]
    pub fn get(&self, key: K) -> &V {
        self.raw.entry(key).wait()
    }

    /// Returns the value for the given key if it has been published, without blocking.
    ///
    /// Unlike [`get`](WaitMap::get), this never registers the key in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use waitmap::WaitMap;
    ///
    /// let map = WaitMap::new();
    /// assert_eq!(map.try_get(&1), None);
    /// map.set(1, "a");
    /// assert_eq!(map.try_get(&1), Some(&"a"));
    /// ```
    #[inline]
    pub fn try_get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.raw.find(key).and_then(raw::Entry::value)
    }

    /// Publishes a value for the given key, waking every reader blocked on it.
    ///
    /// Values are write-once: if the key already has a value, or another thread is
    /// concurrently publishing one, the map is not updated, `value` is dropped, and
    /// `false` is returned. Otherwise `true` is returned, and every subsequent call to
    /// [`get`](WaitMap::get) or [`check`](WaitMap::check) observes the value.
    ///
    /// # Examples
    ///
    /// ```
    /// use waitmap::WaitMap;
    ///
    /// let map = WaitMap::new();
    /// assert!(map.set("x", 1));
    /// assert!(!map.set("x", 2));
    /// assert_eq!(map.get("x"), &1);
    /// ```
    #[inline]
    pub fn set(&self, key: K, value: V) -> bool {
        self.raw.publish(key, value)
    }

    /// Returns `true` if the given key has a published value.
    ///
    /// Keys that readers are waiting on, but that have not been published, report `false`.
    /// A `false` result may be stale as soon as it is returned, so this cannot replace the
    /// blocking guarantee of [`get`](WaitMap::get).
    ///
    /// # Examples
    ///
    /// ```
    /// use waitmap::WaitMap;
    ///
    /// let map = WaitMap::new();
    /// assert!(!map.check(&1));
    /// map.set(1, "a");
    /// assert!(map.check(&1));
    /// assert!(!map.check(&2));
    /// ```
    #[inline]
    pub fn check<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.raw.is_ready(key)
    }
}

// Formats a snapshot of the map. The directory lock is released before any user `Debug`
// code runs.
impl<K, V, S> fmt::Debug for WaitMap<K, V, S>
where
    K: Clone + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();

        for (key, entry) in self.raw.entries() {
            match entry.value() {
                Some(value) => map.entry(&key, value),
                None => map.entry(&key, &format_args!("<pending>")),
            };
        }

        map.finish()
    }
}

impl<K, V, S> Extend<(K, V)> for &WaitMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K, V, S> Extend<(K, V)> for WaitMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let mut map = &*self;
        map.extend(iter);
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for WaitMap<K, V, RandomState>
where
    K: Hash + Eq,
{
    fn from(arr: [(K, V); N]) -> Self {
        WaitMap::from_iter(arr)
    }
}

impl<K, V, S> FromIterator<(K, V)> for WaitMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();

        let map = WaitMap::with_capacity_and_hasher(lower, S::default());
        (&mut &map).extend(iter);
        map
    }
}
