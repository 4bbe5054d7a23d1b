//! Fixed-capacity receive ring with eviction-on-overflow.
//!
//! The ring is empty when `read == write`. Because of that, one slot always
//! stays unused and a ring of capacity `C` holds at most `C - 1` bytes. A push
//! into a full ring drops the oldest unread byte instead of blocking or
//! growing.

/// Circular FIFO of received bytes.
///
/// Not synchronised; [`TransportPort`](super::TransportPort) wraps it in a
/// mutex shared by the receive loop and the consumer.
#[derive(Debug, Clone)]
pub struct RxRingBuffer {
    buf: Box<[u8]>,
    read: usize,
    write: usize,
}

impl RxRingBuffer {
    /// Create an empty ring.
    ///
    /// # Panics
    /// Panics if `capacity < 2`; such a ring could never hold a byte.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must be at least 2, got {capacity}");
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            read: 0,
            write: 0,
        }
    }

    /// Total slots, including the one kept free.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Maximum number of bytes the ring can hold at once: `capacity() - 1`.
    ///
    /// With the default 512-slot ring, 511 bytes fit. Pushing 512 bytes into
    /// an empty ring evicts the first one, so reading back 511 zeros followed
    /// by `1` yields 510 zeros and then `1`.
    pub fn usable_capacity(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn len(&self) -> usize {
        (self.write + self.buf.len() - self.read) % self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Append a byte. Returns `true` if the oldest byte was evicted.
    pub fn push(&mut self, byte: u8) -> bool {
        let cap = self.buf.len();
        let next = (self.write + 1) % cap;
        let evicted = next == self.read;
        if evicted {
            self.read = (self.read + 1) % cap;
        }
        self.buf[self.write] = byte;
        self.write = next;
        evicted
    }

    /// Append a chunk, byte by byte. Returns how many old bytes were evicted.
    pub fn push_slice(&mut self, data: &[u8]) -> usize {
        data.iter().filter(|&&byte| self.push(byte)).count()
    }

    /// Remove the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buf[self.read];
        self.read = (self.read + 1) % self.buf.len();
        Some(byte)
    }

    /// Drop all unread bytes and rewind both indices to zero.
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }

    /// Current `(read, write)` indices.
    pub fn indices(&self) -> (usize, usize) {
        (self.read, self.write)
    }
}

impl Default for RxRingBuffer {
    fn default() -> Self {
        Self::new(super::traits::DEFAULT_RX_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(ring: &mut RxRingBuffer) -> Vec<u8> {
        std::iter::from_fn(|| ring.pop()).collect()
    }

    #[test]
    fn test_new_ring_is_empty() {
        let mut ring = RxRingBuffer::new(512);
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 512);
        assert_eq!(ring.usable_capacity(), 511);
        assert_eq!(ring.pop(), None);
    }

    #[test]
    #[should_panic(expected = "at least 2")]
    fn test_rejects_degenerate_capacity() {
        let _ = RxRingBuffer::new(1);
    }

    #[test]
    fn test_fifo_order() {
        let mut ring = RxRingBuffer::new(8);
        assert_eq!(ring.push_slice(&[1, 2, 3]), 0);
        assert_eq!(ring.pop(), Some(1));
        ring.push(4);
        assert_eq!(drain(&mut ring), vec![2, 3, 4]);
    }

    #[test]
    fn test_fill_to_usable_capacity_without_eviction() {
        let mut ring = RxRingBuffer::new(512);
        let mut input = vec![0u8; 510];
        input.push(1);
        assert_eq!(ring.push_slice(&input), 0);
        assert_eq!(ring.len(), 511);

        let out = drain(&mut ring);
        assert_eq!(out.len(), 511);
        assert!(out[..510].iter().all(|&b| b == 0));
        assert_eq!(out[510], 1);
    }

    #[test]
    fn test_one_over_capacity_evicts_exactly_one() {
        let mut ring = RxRingBuffer::new(512);
        assert_eq!(ring.push_slice(&[0u8; 511]), 0);
        assert!(ring.push(1));
        assert_eq!(ring.len(), 511);

        let out = drain(&mut ring);
        assert_eq!(out.len(), 511);
        assert!(out[..510].iter().all(|&b| b == 0));
        assert_eq!(out[510], 1);
    }

    #[test]
    fn test_two_over_capacity_evicts_two() {
        let mut ring = RxRingBuffer::new(512);
        let mut input = vec![0u8; 512];
        input.push(1);
        assert_eq!(ring.push_slice(&input), 2);

        let out = drain(&mut ring);
        assert_eq!(out.len(), 511);
        assert!(out[..510].iter().all(|&b| b == 0));
        assert_eq!(&out[509..], &[0, 1]);
    }

    #[test]
    fn test_bulk_overflow_across_wrap_boundary() {
        let mut ring = RxRingBuffer::new(8);
        // Move both indices off zero so the next chunk straddles the end.
        ring.push_slice(&[0xAA; 5]);
        drain(&mut ring);
        assert_eq!(ring.indices(), (5, 5));

        let input: Vec<u8> = (1..=10).collect();
        let evicted = ring.push_slice(&input);
        assert_eq!(evicted, 3);
        assert_eq!(drain(&mut ring), vec![4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_chunk_larger_than_capacity_keeps_suffix() {
        let mut ring = RxRingBuffer::new(4);
        let evicted = ring.push_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(evicted, 6);
        assert_eq!(drain(&mut ring), vec![7, 8, 9]);
    }

    #[test]
    fn test_clear_rewinds_indices() {
        let mut ring = RxRingBuffer::new(16);
        ring.push_slice(b"pending");
        ring.pop();
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.indices(), (0, 0));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_extreme_byte_values() {
        let mut ring = RxRingBuffer::new(4);
        ring.push_slice(&[0x00, 0xFF, 0x80]);
        assert_eq!(drain(&mut ring), vec![0x00, 0xFF, 0x80]);
    }
}
