#![allow(dead_code)]

use waitmap::WaitMap;

use std::thread;

// Run the test on different configurations of a `WaitMap`.
pub fn with_map<K, V>(mut test: impl FnMut(&dyn Fn() -> WaitMap<K, V>)) {
    // Default configuration, the directory grows on demand.
    test(&(|| WaitMap::new()));

    // A tiny initial capacity forces the directory to resize repeatedly while readers hold
    // references into it.
    test(&(|| WaitMap::with_capacity(1)));

    // Pre-sized directory.
    if !cfg!(waitmap_stress) {
        test(&(|| WaitMap::builder().capacity(1024).build()));
    }
}

// Prints a log message if `RUST_LOG=debug` is set.
#[macro_export]
macro_rules! debug {
    ($($x:tt)*) => {
        if std::env::var("RUST_LOG").as_deref() == Ok("debug") {
            println!($($x)*);
        }
    };
}

// Returns the number of threads to use for stress testing.
pub fn threads() -> usize {
    if cfg!(miri) {
        2
    } else {
        num_cpus::get_physical().next_power_of_two()
    }
}

// Spin until some thread has registered `len` keys in the map.
//
// Readers register a pending key before they block, so this is used to make sure a reader
// is waiting before the test moves on.
pub fn wait_for_len<K, V>(map: &WaitMap<K, V>, len: usize) {
    while map.len() < len {
        thread::yield_now();
    }
}
