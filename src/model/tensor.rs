//! Scoped tensors with live-count tracking.
//!
//! Every buffer handed to or produced by a classifier is a [`Tensor`]
//! created through a [`TensorRegistry`]. Dropping the tensor releases it, so
//! the registry's live count returns to its baseline once a cycle finishes,
//! whichever path it exits through.

use ndarray::ArrayD;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts tensors that are currently alive.
#[derive(Debug, Clone, Default)]
pub struct TensorRegistry {
    live: Arc<AtomicUsize>,
}

impl TensorRegistry {
    /// Create a registry with no live tensors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tensors created by this registry and not yet dropped.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Take ownership of `data` as a tracked tensor.
    pub fn track(&self, data: ArrayD<f32>) -> Tensor {
        self.live.fetch_add(1, Ordering::SeqCst);
        Tensor {
            data,
            live: Arc::clone(&self.live),
        }
    }
}

/// An owned numeric buffer released on drop.
#[derive(Debug)]
pub struct Tensor {
    data: ArrayD<f32>,
    live: Arc<AtomicUsize>,
}

impl Tensor {
    /// Tensor shape.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Borrow the underlying array.
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Contiguous view of the values, if the layout is standard.
    pub fn as_slice(&self) -> Option<&[f32]> {
        self.data.as_slice()
    }
}

impl Drop for Tensor {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_live_count_follows_scope() {
        let registry = TensorRegistry::new();
        assert_eq!(registry.live(), 0);
        {
            let a = registry.track(ArrayD::zeros(IxDyn(&[1, 4, 4, 3])));
            let _b = registry.track(ArrayD::zeros(IxDyn(&[10])));
            assert_eq!(registry.live(), 2);
            assert_eq!(a.shape(), &[1, 4, 4, 3]);
        }
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_clones_share_the_count() {
        let registry = TensorRegistry::new();
        let other = registry.clone();
        let tensor = other.track(ArrayD::zeros(IxDyn(&[2])));
        assert_eq!(registry.live(), 1);
        drop(tensor);
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_tensor_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Tensor>();
    }
}
