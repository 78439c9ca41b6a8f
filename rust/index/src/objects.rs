use crate::metric::MetricObject;
use parking_lot::RwLock;
use pivotspace_error::{ErrorCodes, PivotspaceError};
use pivotspace_types::{DistanceValue, Verifier};
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GetObjectError {
    #[error("record id {0} is outside the store's valid range")]
    IllegalId(i64),
    #[error("object store failure: {0}")]
    Backend(String),
}

impl PivotspaceError for GetObjectError {
    fn code(&self) -> ErrorCodes {
        match self {
            GetObjectError::IllegalId(_) => ErrorCodes::InvalidArgument,
            GetObjectError::Backend(_) => ErrorCodes::Internal,
        }
    }
}

/// Resolves record ids back to objects. Consulted only for candidates that
/// survive pruning and for the identity checks behind insert/delete/exists.
pub trait ObjectStore<O>: Send + Sync {
    fn get(&self, record_id: i64) -> Result<O, GetObjectError>;
}

/// Append-only in-memory store; record ids are assignment order.
pub struct InMemoryObjectStore<O> {
    objects: RwLock<Vec<O>>,
}

impl<O: Clone> InMemoryObjectStore<O> {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, object: O) -> i64 {
        let mut objects = self.objects.write();
        objects.push(object);
        (objects.len() - 1) as i64
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl<O: Clone> Default for InMemoryObjectStore<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Clone + Send + Sync> ObjectStore<O> for InMemoryObjectStore<O> {
    fn get(&self, record_id: i64) -> Result<O, GetObjectError> {
        let objects = self.objects.read();
        usize::try_from(record_id)
            .ok()
            .and_then(|i| objects.get(i).cloned())
            .ok_or(GetObjectError::IllegalId(record_id))
    }
}

/// The verifier the index hands to the bucket core: resolves a record id
/// through the object store and computes its real distance to the probe
/// object of the in-flight operation.
pub struct StoreVerifier<'a, O, T> {
    probe: &'a O,
    store: &'a dyn ObjectStore<O>,
    _marker: PhantomData<T>,
}

impl<'a, O, T> StoreVerifier<'a, O, T> {
    pub fn new(probe: &'a O, store: &'a dyn ObjectStore<O>) -> Self {
        Self {
            probe,
            store,
            _marker: PhantomData,
        }
    }
}

impl<O: MetricObject<T>, T: DistanceValue> Verifier<T> for StoreVerifier<'_, O, T> {
    fn distance_to(&self, record_id: i64) -> Result<T, Box<dyn PivotspaceError>> {
        let object = self.store.get(record_id).map_err(|e| e.boxed())?;
        Ok(self.probe.distance(&object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_ids_are_rejected() {
        let store = InMemoryObjectStore::new();
        let id = store.add(5i32);
        assert_eq!(id, 0);
        assert_eq!(store.get(0).unwrap(), 5);
        assert!(matches!(store.get(1), Err(GetObjectError::IllegalId(1))));
        assert!(matches!(store.get(-4), Err(GetObjectError::IllegalId(-4))));
    }

    #[test]
    fn test_store_verifier_measures_from_probe() {
        let store = InMemoryObjectStore::new();
        store.add(10i32);
        store.add(3i32);
        let probe = 7i32;
        let verifier = StoreVerifier::<i32, i32>::new(&probe, &store);
        assert_eq!(verifier.distance_to(0).unwrap(), 3);
        assert_eq!(verifier.distance_to(1).unwrap(), 4);
        assert!(verifier.distance_to(9).is_err());
    }
}
