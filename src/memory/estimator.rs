//! Size estimation for opaque cached values.
//!
//! The store never inspects values itself. It asks a [`SizeEstimator`] how
//! large a value is and falls back to the configured default when the
//! estimator fails.

use crate::error::Result;
use serde::Serialize;
use std::marker::PhantomData;

/// Estimates the stored size of a value in bytes.
pub trait SizeEstimator<V>: Send + Sync {
    fn estimate(&self, value: &V) -> Result<usize>;
}

/// Measures a value by the length of its JSON serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSizeEstimator;

impl<V: Serialize> SizeEstimator<V> for JsonSizeEstimator {
    fn estimate(&self, value: &V) -> Result<usize> {
        Ok(serde_json::to_vec(value)?.len())
    }
}

/// Adapts a closure into a [`SizeEstimator`].
///
/// ```
/// use recall::memory::{FnSizeEstimator, SizeEstimator};
///
/// let estimator = FnSizeEstimator::new(|value: &String| Ok(value.len()));
/// assert_eq!(estimator.estimate(&"hello".to_string()).unwrap(), 5);
/// ```
pub struct FnSizeEstimator<V, F> {
    func: F,
    _value: PhantomData<fn(&V)>,
}

impl<V, F> FnSizeEstimator<V, F>
where
    F: Fn(&V) -> Result<usize> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _value: PhantomData,
        }
    }
}

impl<V, F> SizeEstimator<V> for FnSizeEstimator<V, F>
where
    F: Fn(&V) -> Result<usize> + Send + Sync,
{
    fn estimate(&self, value: &V) -> Result<usize> {
        (self.func)(value)
    }
}
