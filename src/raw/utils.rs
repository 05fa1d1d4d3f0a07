use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

// Emits a `tracing` event at trace level when the `tracing` feature is enabled.
macro_rules! trace {
    ($($x:tt)*) => {{
        #[cfg(feature = "tracing")]
        tracing::trace!($($x)*);
    }};
}

pub(crate) use trace;

// Acquire a lock, ignoring poisoning.
//
// The directory is only ever mutated through single `HashMap` operations, each of which
// leaves the table consistent even if a user-provided `Hash` or `Eq` implementation panics.
#[inline]
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// `Box<T>` but aliasable.
//
// The allocation does not move when the `Shared` itself is moved, for example
// when the directory is resized, so references into it remain valid for as long
// as the `Shared` is alive.
pub struct Shared<T>(NonNull<T>);

// Safety: `Shared` hands out shared references to its value across threads, in the
// same way as `Arc<T>`.
unsafe impl<T: Send + Sync> Send for Shared<T> {}
unsafe impl<T: Send + Sync> Sync for Shared<T> {}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Shared<T> {
        Shared(unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(value))) })
    }
}

impl<T> Shared<T> {
    // Returns a reference to the value that is not tied to the borrow of this `Shared`.
    //
    // # Safety
    //
    // The `Shared` must not be dropped for the lifetime `'a`.
    #[inline]
    pub unsafe fn detach<'a>(&self) -> &'a T {
        unsafe { &*self.0.as_ptr() }
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.0.as_ptr() }
    }
}

impl<T> Drop for Shared<T> {
    #[inline]
    fn drop(&mut self) {
        let _ = unsafe { Box::from_raw(self.0.as_ptr()) };
    }
}
