#![no_main]

use libfuzzer_sys::fuzz_target;

use arbitrary::Arbitrary;
use std::collections::HashMap as StdHashMap;
use waitmap::WaitMap;

#[derive(Debug, Arbitrary)]
enum Operation<K, V> {
    Set(K, V),
    Check(K),
    TryGet(K),
    // Only performed on keys the model knows are published, as `get` would block forever
    // on a single thread otherwise.
    Get(K),
    Len,
    IsEmpty,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    capacity: u8,
    operations: Vec<Operation<u8, u32>>,
}

fuzz_target!(|input: FuzzInput| {
    // A write-once model: the first value set for a key wins.
    let mut model = StdHashMap::new();
    let map = WaitMap::with_capacity(input.capacity as usize);

    for op in input.operations {
        match op {
            Operation::Set(k, v) => {
                let expected = !model.contains_key(&k);
                model.entry(k).or_insert(v);
                assert_eq!(map.set(k, v), expected);
            }
            Operation::Check(k) => {
                assert_eq!(map.check(&k), model.contains_key(&k));
            }
            Operation::TryGet(k) => {
                assert_eq!(map.try_get(&k), model.get(&k));
            }
            Operation::Get(k) => {
                if let Some(v) = model.get(&k) {
                    assert_eq!(map.get(k), v);
                }
            }
            Operation::Len => {
                assert_eq!(map.len(), model.len());
            }
            Operation::IsEmpty => {
                assert_eq!(map.is_empty(), model.is_empty());
            }
        }
    }

    assert_eq!(format!("{:?}", map).matches("<pending>").count(), 0);
});
