#![doc = include_str!("../README.md")]

mod map;
mod raw;

pub use map::{WaitMap, WaitMapBuilder};
