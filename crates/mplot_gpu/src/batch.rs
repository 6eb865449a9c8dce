//! CPU side of the instance batch
//!
//! Collects packed [`Instance`]s for a frame, orders them faces-first and
//! tracks how large the GPU buffer needs to be. No device is touched here so
//! the ordering and growth rules can be tested without a GPU.

use crate::instance::Instance;

/// Extra instances allocated on top of the required count when the buffer grows
pub const INSTANCE_HEADROOM: usize = 256;

/// Instance capacity of a fresh batch
pub const INITIAL_INSTANCE_CAPACITY: usize = 1024;

/// One frame's worth of instances plus the capacity of the GPU buffer backing them
#[derive(Debug, Clone)]
pub struct InstanceBatch {
    instances: Vec<Instance>,
    capacity: usize,
}

impl Default for InstanceBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceBatch {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_INSTANCE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            instances: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Stable partition: faces first, each group keeping submission order
    pub fn partition_faces_first(&mut self) {
        self.instances.sort_by_key(|inst| !inst.is_face());
    }

    /// Index of the first overlay instance (only meaningful after partitioning)
    pub fn split_index(&self) -> usize {
        self.instances.partition_point(Instance::is_face)
    }

    pub fn face_count(&self) -> usize {
        self.instances.iter().filter(|inst| inst.is_face()).count()
    }

    /// Capacity of the GPU buffer, in instances
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the new capacity when `required` instances no longer fit
    pub fn reserve_for(&mut self, required: usize) -> Option<usize> {
        if required <= self.capacity {
            return None;
        }
        self.capacity = required + INSTANCE_HEADROOM;
        Some(self.capacity)
    }

    /// Drop this frame's instances; capacity is kept
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}
