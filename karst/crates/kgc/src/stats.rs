//! Allocation and collection counters.
//!
//! Counters accumulate over the life of a heap and are never reset; tests
//! and the collection log read them to observe collector behavior.

/// Counters for one heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct GcStats {
    /// Completed collection cycles.
    pub cycles: u64,

    /// Objects ever allocated.
    pub objects_allocated: u64,

    /// Objects freed by sweeps.
    pub objects_freed: u64,

    /// Bytes freed by sweeps.
    pub bytes_freed: u64,
}

impl GcStats {
    /// Objects currently live (allocated minus freed).
    pub fn live_objects(&self) -> u64 {
        self.objects_allocated - self.objects_freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_objects() {
        let stats = GcStats {
            objects_allocated: 10,
            objects_freed: 4,
            ..Default::default()
        };
        assert_eq!(stats.live_objects(), 6);
    }

    #[test]
    fn test_default_is_zeroed() {
        let stats = GcStats::default();
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.live_objects(), 0);
    }
}
