//! Per-plane staging between the producer and the real-time consumer.
//!
//! One SPSC ring per output channel, all sharing one capacity. The producer
//! half stays with the session on the application thread; the consumer half
//! moves into the driver callback. Occupancy is observable from either side,
//! which is how delay accounting works without touching the consumer.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Write side of the staging planes, owned by the session.
pub struct StagingProducer {
    planes: Vec<HeapProd<u8>>,
    capacity: usize,
}

/// Read side of the staging planes, owned by the render callback.
pub struct StagingConsumer {
    planes: Vec<HeapCons<u8>>,
    capacity: usize,
}

/// Creates the staging planes and splits them into their two halves.
///
/// `capacity` is per plane, in native-format bytes, and must be a multiple
/// of the native sample size so reads never split a sample.
pub fn create_staging(planes: usize, capacity: usize) -> (StagingProducer, StagingConsumer) {
    let mut producers = Vec::with_capacity(planes);
    let mut consumers = Vec::with_capacity(planes);
    for _ in 0..planes {
        let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
        producers.push(producer);
        consumers.push(consumer);
    }
    (
        StagingProducer {
            planes: producers,
            capacity,
        },
        StagingConsumer {
            planes: consumers,
            capacity,
        },
    )
}

impl StagingProducer {
    /// Appends bytes to one plane, truncating to the free space.
    ///
    /// Returns the number of bytes actually written. Callers that must keep
    /// planes in lock step size their writes from [`available_to_write`]
    /// first.
    ///
    /// [`available_to_write`]: StagingProducer::available_to_write
    pub fn write(&mut self, plane: usize, bytes: &[u8]) -> usize {
        self.planes[plane].push_slice(bytes)
    }

    /// Free space in bytes, taken as the minimum across planes.
    #[must_use]
    pub fn available_to_write(&self) -> usize {
        self.planes
            .iter()
            .map(Observer::vacant_len)
            .min()
            .unwrap_or(0)
    }

    /// Buffered bytes, taken as the minimum across planes.
    #[must_use]
    pub fn available_to_read(&self) -> usize {
        self.planes
            .iter()
            .map(Observer::occupied_len)
            .min()
            .unwrap_or(0)
    }

    /// Fixed per-plane capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of planes.
    #[must_use]
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }
}

impl StagingConsumer {
    /// Pops bytes from one plane into `dst`, FIFO order.
    ///
    /// Returns the number of bytes actually read. The render path checks
    /// [`available_to_read`] first and only ever reads exact amounts.
    ///
    /// [`available_to_read`]: StagingConsumer::available_to_read
    pub fn read(&mut self, plane: usize, dst: &mut [u8]) -> usize {
        self.planes[plane].pop_slice(dst)
    }

    /// Buffered bytes, taken as the minimum across planes.
    #[must_use]
    pub fn available_to_read(&self) -> usize {
        self.planes
            .iter()
            .map(Observer::occupied_len)
            .min()
            .unwrap_or(0)
    }

    /// Discards everything buffered in every plane.
    pub fn reset(&mut self) {
        for plane in &mut self.planes {
            plane.clear();
        }
    }

    /// Fixed per-plane capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of planes.
    #[must_use]
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }
}
