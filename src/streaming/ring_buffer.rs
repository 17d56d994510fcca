//! Sample ring buffer between the render thread and the audio thread
//!
//! One producer, one consumer. Storage sits behind a `parking_lot` mutex; the
//! positions are atomics so fill level can be read without taking the lock.

use crate::{AmbientError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity ring of interleaved 16-bit samples
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Mutex<Vec<i16>>,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
    capacity: usize,
    mask: usize,
}

impl RingBuffer {
    /// Create a buffer; capacity is rounded up to a power of two
    ///
    /// # Errors
    ///
    /// `AudioDeviceError` for a zero or absurdly large capacity.
    pub fn new(requested_capacity: usize) -> Result<Self> {
        if requested_capacity == 0 {
            return Err(AmbientError::AudioDeviceError(
                "Ring buffer capacity must be greater than 0".into(),
            ));
        }
        let capacity = requested_capacity.next_power_of_two();
        const MAX_CAPACITY: usize = 64 * 1024 * 1024 / std::mem::size_of::<i16>();
        if capacity > MAX_CAPACITY {
            return Err(AmbientError::AudioDeviceError(format!(
                "Ring buffer capacity {capacity} exceeds maximum {MAX_CAPACITY}"
            )));
        }
        Ok(RingBuffer {
            buffer: Mutex::new(vec![0; capacity]),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        })
    }

    /// Capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples waiting to be read
    pub fn available_read(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Free slots
    pub fn available_write(&self) -> usize {
        self.capacity - self.available_read()
    }

    /// Fill level in `[0, 1]`
    pub fn fill_percentage(&self) -> f32 {
        self.available_read() as f32 / self.capacity as f32
    }

    /// Write as many samples as fit; returns the count written
    pub fn write(&self, samples: &[i16]) -> usize {
        let mut buf = self.buffer.lock();
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let free = self.capacity - write_pos.wrapping_sub(read_pos);
        let n = samples.len().min(free);
        if n == 0 {
            return 0;
        }

        let start = write_pos & self.mask;
        let first = n.min(self.capacity - start);
        buf[start..start + first].copy_from_slice(&samples[..first]);
        buf[..n - first].copy_from_slice(&samples[first..n]);
        drop(buf);

        self.write_pos
            .store(write_pos.wrapping_add(n), Ordering::Release);
        n
    }

    /// Read up to `dest.len()` samples; returns the count read
    pub fn read(&self, dest: &mut [i16]) -> usize {
        let buf = self.buffer.lock();
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let n = dest.len().min(write_pos.wrapping_sub(read_pos));
        if n == 0 {
            return 0;
        }

        let start = read_pos & self.mask;
        let first = n.min(self.capacity - start);
        dest[..first].copy_from_slice(&buf[start..start + first]);
        dest[first..n].copy_from_slice(&buf[..n - first]);
        drop(buf);

        self.read_pos
            .store(read_pos.wrapping_add(n), Ordering::Release);
        n
    }

    /// Discard everything buffered
    pub fn flush(&self) {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write_pos, Ordering::Release);
    }
}
