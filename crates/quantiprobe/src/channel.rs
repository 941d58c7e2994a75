use crate::error::ChannelError;
use crate::sync::{AtomicUsize, Ordering, UnsafeCell};
use crossbeam_utils::CachePadded;
use std::fmt;
use std::mem::MaybeUninit;
use std::num::NonZeroUsize;
use std::sync::Arc;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// The channel is an arena of `capacity + 1` slots addressed by two cursors.
// Both cursors stay in `[0, capacity]` and advance modulo `capacity + 1`.
// One slot is always left unused, so:
//
//   empty  <=>  read_pos == write_pos
//   full   <=>  next(write_pos) == read_pos
//
// ## Memory Ordering Protocol
//
// **Producer (try_send):**
// 1. Load `write_pos` with Relaxed (only the producer writes it)
// 2. Load `read_pos` with Acquire (synchronizes with consumer's Release)
// 3. If full: drop the value and return false
// 4. Write the value into `slots[write_pos]`
// 5. Store `next(write_pos)` with Release (publishes the slot to consumer)
//
// **Consumer (try_receive):**
// 1. Load `read_pos` with Relaxed (only the consumer writes it)
// 2. Load `write_pos` with Acquire (synchronizes with producer's Release)
// 3. If empty: return None
// 4. Move the value out of `slots[read_pos]`
// 5. Store `next(read_pos)` with Release (hands the slot back to producer)
//
// ## Slot Ownership
//
// A slot belongs to the producer until the Release store of `write_pos`
// that covers it, and to the consumer from then until the Release store of
// `read_pos` that passes it. The two sides never touch the same slot at the
// same time as long as there is exactly one of each.
//
// =============================================================================

/// Wait-free single-producer single-consumer ring channel.
///
/// Holds up to `capacity` elements in a fixed arena allocated once at
/// construction. Sends on a full channel and receives on an empty one fail
/// immediately; the channel never blocks, retries or grows.
///
/// `RingChannel` is `Send` but not `Sync`: calling [`try_send`] and
/// [`try_receive`] directly is single-threaded. To move values between two
/// threads, [`split`] the channel into a [`Producer`] and a [`Consumer`].
///
/// [`try_send`]: RingChannel::try_send
/// [`try_receive`]: RingChannel::try_receive
/// [`split`]: RingChannel::split
pub struct RingChannel<T> {
    /// Next slot to write (written by producer, read by consumer)
    write_pos: CachePadded<AtomicUsize>,
    /// Next slot to read (written by consumer, read by producer)
    read_pos: CachePadded<AtomicUsize>,
    /// Usable capacity; `slots.len() == capacity + 1`
    capacity: usize,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

impl<T> RingChannel<T> {
    /// Creates a channel that holds up to `capacity` elements.
    ///
    /// Returns [`ChannelError::ZeroCapacity`] for a capacity of zero; such a
    /// channel would report full forever. Returns
    /// [`ChannelError::CapacityOverflow`] when `capacity + 1` slots do not fit
    /// in the address space or cannot be allocated.
    pub fn new(capacity: usize) -> Result<Self, ChannelError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(ChannelError::ZeroCapacity)?;
        let capacity = capacity.get();
        let slots = Self::alloc_slots(capacity)?;

        log::trace!("ring channel created: capacity={capacity}, slots={}", slots.len());

        Ok(Self {
            write_pos: CachePadded::new(AtomicUsize::new(0)),
            read_pos: CachePadded::new(AtomicUsize::new(0)),
            capacity,
            slots,
        })
    }

    /// Creates a channel that holds up to `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics where [`new`](Self::new) would return
    /// [`ChannelError::CapacityOverflow`].
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        match Self::new(capacity.get()) {
            Ok(channel) => channel,
            Err(e) => panic!("{e}"),
        }
    }

    fn alloc_slots(capacity: usize) -> Result<Box<[UnsafeCell<MaybeUninit<T>>]>, ChannelError> {
        let overflow = || ChannelError::CapacityOverflow {
            requested: capacity,
        };
        let slot_count = capacity.checked_add(1).ok_or_else(overflow)?;

        // Fails on byte-size overflow as well as on allocator refusal.
        let mut slots = Vec::new();
        slots.try_reserve_exact(slot_count).map_err(|_| overflow())?;
        slots.extend((0..slot_count).map(|_| UnsafeCell::new(MaybeUninit::uninit())));
        Ok(slots.into_boxed_slice())
    }

    /// Splits the channel into its producer and consumer endpoints.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        log::trace!("ring channel split: capacity={}", self.capacity);
        let shared = Arc::new(self);
        (
            Producer {
                channel: Arc::clone(&shared),
            },
            Consumer { channel: shared },
        )
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Returns the number of elements the channel can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of elements currently in the channel.
    ///
    /// With both endpoints active this is a snapshot that may be stale by
    /// the time it is returned.
    #[inline]
    pub fn len(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        if write >= read {
            write - read
        } else {
            self.slots.len() - read + write
        }
    }

    /// Returns true if the channel holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.write_pos.load(Ordering::Acquire) == self.read_pos.load(Ordering::Acquire)
    }

    /// Returns true if a send would currently fail.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.next(self.write_pos.load(Ordering::Acquire)) == self.read_pos.load(Ordering::Acquire)
    }

    /// Advances a cursor by one slot, wrapping at `capacity + 1`.
    #[inline]
    fn next(&self, pos: usize) -> usize {
        let next = pos + 1;
        if next == self.slots.len() {
            0
        } else {
            next
        }
    }

    // ---------------------------------------------------------------------
    // PRODUCER
    // ---------------------------------------------------------------------

    /// Sends `value` if there is room.
    ///
    /// Returns `false` when the channel is full. The value is dropped and
    /// the channel is left untouched; retrying is up to the caller.
    #[inline]
    pub fn try_send(&self, value: T) -> bool {
        let write = self.write_pos.load(Ordering::Relaxed);
        let next = self.next(write);

        if next == self.read_pos.load(Ordering::Acquire) {
            return false;
        }

        // SAFETY: `write` is not in [read_pos, write_pos), so the consumer
        // does not own this slot, and only the producer side writes slots.
        self.slots[write].with_mut(|slot| unsafe {
            (*slot).write(value);
        });

        self.write_pos.store(next, Ordering::Release);
        true
    }

    // ---------------------------------------------------------------------
    // CONSUMER
    // ---------------------------------------------------------------------

    /// Receives the oldest element, or `None` if the channel is empty.
    #[inline]
    pub fn try_receive(&self) -> Option<T> {
        let read = self.read_pos.load(Ordering::Relaxed);

        if read == self.write_pos.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: `read` is in [read_pos, write_pos). The producer initialized
        // this slot before its Release store of `write_pos`, which the Acquire
        // load above observed. The producer will not reuse the slot until the
        // Release store of `read_pos` below.
        let value = self.slots[read].with(|slot| unsafe { (*slot).assume_init_read() });

        self.read_pos.store(self.next(read), Ordering::Release);
        Some(value)
    }
}

impl<T> Drop for RingChannel<T> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<T>() {
            return;
        }

        // Both endpoints are gone. Acquire pairs with whichever side
        // stored last, so every slot write and read is visible here.
        let write = self.write_pos.load(Ordering::Acquire);
        let mut pos = self.read_pos.load(Ordering::Acquire);
        while pos != write {
            // SAFETY: slots in [read_pos, write_pos) are initialized and
            // were never moved out.
            self.slots[pos].with_mut(|slot| unsafe { (*slot).assume_init_drop() });
            pos = self.next(pos);
        }
    }
}

impl<T> fmt::Debug for RingChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingChannel")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------
// ENDPOINTS
// ---------------------------------------------------------------------

/// Sending half of a split [`RingChannel`].
///
/// Not `Clone` and not `Sync`, so at most one thread sends at a time.
pub struct Producer<T> {
    channel: Arc<RingChannel<T>>,
}

/// Receiving half of a split [`RingChannel`].
///
/// Not `Clone` and not `Sync`, so at most one thread receives at a time.
pub struct Consumer<T> {
    channel: Arc<RingChannel<T>>,
}

// SAFETY: the channel is shared by exactly one Producer and one Consumer.
// The producer only writes `write_pos` and unowned slots, the consumer only
// writes `read_pos` and slots it owns; ownership passes through the
// Acquire/Release pairs on the cursors. Neither handle can be cloned or
// shared, so each side runs on at most one thread at a time.
unsafe impl<T: Send> Send for Producer<T> {}
unsafe impl<T: Send> Send for Consumer<T> {}

impl<T> Producer<T> {
    /// See [`RingChannel::try_send`].
    #[inline]
    pub fn try_send(&self, value: T) -> bool {
        self.channel.try_send(value)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }
}

impl<T> Consumer<T> {
    /// See [`RingChannel::try_receive`].
    #[inline]
    pub fn try_receive(&self) -> Option<T> {
        self.channel.try_receive()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Producer").field(&*self.channel).finish()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Consumer").field(&*self.channel).finish()
    }
}
