//! Lock-free double-buffered cell for handing values between threads.
//!
//! A [`CrossThreadCell`] holds two instances of `T`: a *front* slot that only
//! the reader touches, and a *back* slot that the writer mutates. Publishing
//! is a release-store of a dirty bit; the reader's acquire-load of that bit
//! gates the back → front copy, so the reader never observes a half-written
//! value.
//!
//! Roles are enforced by ownership: [`CrossThreadCell::split`] yields exactly
//! one [`CellWriter`] and one [`CellReader`], neither of which is `Clone`.
//!
//! | Operation | Thread | Waits? |
//! |-----------|--------|--------|
//! | [`CellReader::read`] | reader | never |
//! | [`CellReader::peek`] | reader | never |
//! | [`CellWriter::try_write`] | writer | never |
//! | [`CellWriter::write`] | writer | spins while a copy is in flight |
//! | [`CellWriter::mark_dirty`] | writer | never |
//! | [`CellWriter::peek`] | writer | never |
//!
//! When the real-time thread is the writer it must use `try_write`.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Back slot holds a value the reader has not adopted yet.
const DIRTY: u8 = 1 << 0;
/// Writer holds a mutable borrow of the back slot.
const WRITING: u8 = 1 << 1;
/// Reader is copying the back slot into the front slot.
const COPYING: u8 = 1 << 2;

const SPINS_BEFORE_YIELD: u32 = 64;

struct Slots<T> {
    front: UnsafeCell<T>,
    back: UnsafeCell<T>,
    state: AtomicU8,
}

// SAFETY: `front` is only accessed through the unique `CellReader` (or through
// `&mut CrossThreadCell` before the split). `back` is mutated only while the
// writer holds WRITING, which it can only acquire while COPYING is clear; the
// reader only reads `back` while holding COPYING, which it can only acquire
// while WRITING is clear. Shared reads of `back` from both sides may overlap,
// hence `T: Sync`.
unsafe impl<T: Send + Sync> Sync for Slots<T> {}

impl<T> Slots<T> {
    fn new(front: T, back: T) -> Self {
        Self {
            front: UnsafeCell::new(front),
            back: UnsafeCell::new(back),
            state: AtomicU8::new(0),
        }
    }
}

/// Double-buffered single-writer/single-reader cell.
///
/// Construct it, optionally seed it with [`set_all`](Self::set_all), then
/// [`split`](Self::split) it and move each half to its thread.
pub struct CrossThreadCell<T> {
    slots: Slots<T>,
}

impl<T: Clone> CrossThreadCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slots: Slots::new(initial.clone(), initial),
        }
    }
}

impl<T> CrossThreadCell<T> {
    /// Builds each slot independently, e.g. to give both a reserved capacity
    /// (cloning a `Vec` does not carry its capacity over).
    pub fn from_fn(mut make: impl FnMut() -> T) -> Self {
        let front = make();
        let back = make();
        Self {
            slots: Slots::new(front, back),
        }
    }

    /// Current front value.
    pub fn get(&self) -> &T {
        // SAFETY: unsplit, so no other handle exists.
        unsafe { &*self.slots.front.get() }
    }

    pub fn split(self) -> (CellWriter<T>, CellReader<T>) {
        let slots = Arc::new(self.slots);
        (
            CellWriter {
                slots: Arc::clone(&slots),
            },
            CellReader { slots },
        )
    }
}

impl<T: Clone> CrossThreadCell<T> {
    /// Sets both slots synchronously and clears any pending publish.
    pub fn set_all(&mut self, value: T) {
        self.slots.front.get_mut().clone_from(&value);
        *self.slots.back.get_mut() = value;
        *self.slots.state.get_mut() = 0;
    }
}

impl<T: Default + Clone> Default for CrossThreadCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for CrossThreadCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossThreadCell")
            .field("value", self.get())
            .finish()
    }
}

/// Producer half of a [`CrossThreadCell`].
pub struct CellWriter<T> {
    slots: Arc<Slots<T>>,
}

impl<T> CellWriter<T> {
    /// Exclusive access to the back slot.
    ///
    /// Spins (yielding after a short burst) while the reader is mid-copy.
    /// Call [`mark_dirty`](Self::mark_dirty) after the guard is dropped to
    /// publish the change.
    pub fn write(&mut self) -> WriteGuard<'_, T> {
        let mut spins = 0u32;
        while !self.try_acquire() {
            if spins < SPINS_BEFORE_YIELD {
                spins += 1;
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
        WriteGuard { writer: self }
    }

    /// Like [`write`](Self::write) but returns `None` instead of waiting.
    pub fn try_write(&mut self) -> Option<WriteGuard<'_, T>> {
        if self.try_acquire() {
            Some(WriteGuard { writer: self })
        } else {
            None
        }
    }

    #[inline]
    pub fn mark_dirty(&self) {
        self.slots.state.fetch_or(DIRTY, Ordering::Release);
    }

    pub fn publish(&mut self, value: T) {
        *self.write() = value;
        self.mark_dirty();
    }

    /// Publishes unless the reader is mid-copy. Returns whether it published.
    pub fn try_publish(&mut self, value: T) -> bool {
        let Some(mut guard) = self.try_write() else {
            return false;
        };
        *guard = value;
        drop(guard);
        self.mark_dirty();
        true
    }

    /// Replaces the back slot and marks it dirty; the reader adopts it on its
    /// next [`read`](CellReader::read), after which both slots agree.
    pub fn set_all(&mut self, value: T) {
        self.publish(value);
    }

    /// The writer's latest value. Never older than what the reader sees.
    pub fn peek(&self) -> &T {
        // SAFETY: the back slot is only mutated through a `WriteGuard`, which
        // borrows `self` mutably, so no mutation can overlap this borrow. The
        // reader may concurrently read it, which `T: Sync` permits.
        unsafe { &*self.slots.back.get() }
    }

    /// Whether a published value is still waiting for the reader.
    pub fn is_pending(&self) -> bool {
        self.slots.state.load(Ordering::Acquire) & DIRTY != 0
    }

    fn try_acquire(&self) -> bool {
        let state = &self.slots.state;
        let mut current = state.load(Ordering::Relaxed);
        loop {
            if current & COPYING != 0 {
                return false;
            }
            match state.compare_exchange_weak(
                current,
                current | WRITING,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self) {
        self.slots.state.fetch_and(!WRITING, Ordering::Release);
    }
}

impl<T> fmt::Debug for CellWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellWriter")
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

/// Mutable borrow of the back slot. Dropping it releases the slot.
pub struct WriteGuard<'a, T> {
    writer: &'a mut CellWriter<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: WRITING is held, so the reader cannot be copying.
        unsafe { &*self.writer.slots.back.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: WRITING is held and the guard borrows the writer uniquely.
        unsafe { &mut *self.writer.slots.back.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.writer.release();
    }
}

/// Consumer half of a [`CrossThreadCell`].
pub struct CellReader<T> {
    slots: Arc<Slots<T>>,
}

impl<T: Clone> CellReader<T> {
    /// Adopts a pending publish (if any) and returns the current value.
    ///
    /// Never waits: if the writer is holding the back slot right now, the
    /// swap is deferred to the next call. The copy uses `clone_from`, so
    /// containers reuse the front slot's allocation when it is large enough.
    pub fn read(&mut self) -> &T {
        let slots = &*self.slots;
        if slots.state.load(Ordering::Acquire) & DIRTY != 0
            && slots
                .state
                .compare_exchange(DIRTY, COPYING, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
        {
            // SAFETY: COPYING is held, so the writer cannot mutate `back`;
            // `front` belongs to this reader.
            unsafe {
                (*slots.front.get()).clone_from(&*slots.back.get());
            }
            slots.state.fetch_and(!COPYING, Ordering::Release);
        }
        self.peek()
    }
}

impl<T> CellReader<T> {
    /// Current value without adopting a pending publish.
    #[inline]
    pub fn peek(&self) -> &T {
        // SAFETY: only this reader writes `front`, and only inside `read`,
        // which needs `&mut self`.
        unsafe { &*self.slots.front.get() }
    }

    pub fn has_pending(&self) -> bool {
        self.slots.state.load(Ordering::Acquire) & DIRTY != 0
    }
}

impl<T: fmt::Debug> fmt::Debug for CellReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellReader")
            .field("value", self.peek())
            .finish()
    }
}
