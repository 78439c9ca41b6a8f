use crate::address_function::AddressFunction;
use crate::config::BucketIndexConfig;
use crate::metric::{MetricObject, PivotSet};
use crate::objects::{ObjectStore, StoreVerifier};
use pivotspace_bucketstore::{
    BucketProvider, ByteStore, DeleteResult, ExistsResult, InsertResult,
};
use pivotspace_cache::CacheConfigError;
use pivotspace_error::{ErrorCodes, PivotspaceError};
use pivotspace_types::{BucketEntry, DistanceValue, RangeQuery, ResultCollector};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, PartialEq)]
pub enum InsertStatus {
    /// Stored under the given record id.
    Ok(i64),
    /// The same logical object is already stored under the given id.
    Exists(i64),
}

#[derive(Debug, PartialEq)]
pub enum DeleteStatus {
    Ok(i64),
    NotExists,
}

#[derive(Debug, PartialEq)]
pub enum ExistsStatus {
    Exists(i64),
    NotExists,
}

#[derive(Error, Debug)]
pub enum IndexConfigError {
    #[error("config declares {configured} pivots but the pivot set holds {actual}")]
    PivotCountMismatch { configured: usize, actual: usize },
    #[error("the pivot set must be frozen and non-empty before indexing")]
    EmptyPivotSet,
    #[error(transparent)]
    Cache(#[from] CacheConfigError),
}

impl PivotspaceError for IndexConfigError {
    fn code(&self) -> ErrorCodes {
        match self {
            IndexConfigError::PivotCountMismatch { .. } => ErrorCodes::InvalidArgument,
            IndexConfigError::EmptyPivotSet => ErrorCodes::FailedPrecondition,
            IndexConfigError::Cache(e) => e.code(),
        }
    }
}

/// The index façade over the pivot-mapped bucket core.
///
/// Every operation maps its object into fingerprint space through the
/// frozen pivot set (P distance calls), derives the bucket address, fetches
/// the container through the cache-fronted provider, delegates, and hands
/// the mutated container's bytes back to the store. Mutations hold the
/// per-address lock for the whole read-modify-write; searches read the
/// current packed snapshot without it.
pub struct BucketIndex<O, T: DistanceValue> {
    pivots: PivotSet<O, T>,
    address_function: Box<dyn AddressFunction<T>>,
    provider: BucketProvider<T>,
    objects: Arc<dyn ObjectStore<O>>,
}

impl<O: MetricObject<T>, T: DistanceValue> BucketIndex<O, T> {
    pub fn new(
        pivots: PivotSet<O, T>,
        address_function: Box<dyn AddressFunction<T>>,
        objects: Arc<dyn ObjectStore<O>>,
        store: Arc<dyn ByteStore>,
        config: &BucketIndexConfig,
    ) -> Result<Self, IndexConfigError> {
        if pivots.is_empty() {
            return Err(IndexConfigError::EmptyPivotSet);
        }
        if config.pivot_count != pivots.len() {
            return Err(IndexConfigError::PivotCountMismatch {
                configured: config.pivot_count,
                actual: pivots.len(),
            });
        }
        let cache = pivotspace_cache::from_config(&config.cache)?;
        Ok(Self {
            pivots,
            address_function,
            provider: BucketProvider::new(store, cache),
            objects,
        })
    }

    pub fn pivot_count(&self) -> usize {
        self.pivots.len()
    }

    /// Insert with the duplicate check. Returns `Exists` with the resident
    /// id when the same logical object is already stored; the persisted
    /// bytes are left untouched in that case.
    pub fn insert(
        &self,
        object: &O,
        record_id: i64,
    ) -> Result<InsertStatus, Box<dyn PivotspaceError>> {
        let fingerprint = self.pivots.fingerprint(object);
        let address = self.address_function.address(&fingerprint);
        let _guard = self.provider.lock(&address);
        let mut container = self
            .provider
            .fetch_or_create(&address, self.pivots.len())
            .map_err(|e| e.boxed())?;
        let verifier = StoreVerifier::new(object, self.objects.as_ref());
        match container
            .insert(BucketEntry::new(fingerprint, record_id), &verifier)
            .map_err(|e| e.boxed())?
        {
            InsertResult::Inserted => {
                self.provider
                    .persist(&address, &mut container)
                    .map_err(|e| e.boxed())?;
                Ok(InsertStatus::Ok(record_id))
            }
            InsertResult::AlreadyExists(id) => Ok(InsertStatus::Exists(id)),
        }
    }

    /// Insert without the duplicate check, for initial load phases where
    /// the caller has already deduplicated upstream.
    pub fn bulk_insert(&self, object: &O, record_id: i64) -> Result<(), Box<dyn PivotspaceError>> {
        let fingerprint = self.pivots.fingerprint(object);
        let address = self.address_function.address(&fingerprint);
        let _guard = self.provider.lock(&address);
        let mut container = self
            .provider
            .fetch_or_create(&address, self.pivots.len())
            .map_err(|e| e.boxed())?;
        container
            .bulk_insert(vec![BucketEntry::new(fingerprint, record_id)])
            .map_err(|e| e.boxed())?;
        self.provider
            .persist(&address, &mut container)
            .map_err(|e| e.boxed())
    }

    pub fn delete(&self, object: &O) -> Result<DeleteStatus, Box<dyn PivotspaceError>> {
        let fingerprint = self.pivots.fingerprint(object);
        let address = self.address_function.address(&fingerprint);
        let _guard = self.provider.lock(&address);
        let mut container = match self.provider.fetch(&address).map_err(|e| e.boxed())? {
            Some(container) => container,
            None => return Ok(DeleteStatus::NotExists),
        };
        let verifier = StoreVerifier::new(object, self.objects.as_ref());
        match container
            .delete(&fingerprint, &verifier)
            .map_err(|e| e.boxed())?
        {
            DeleteResult::Deleted(id) => {
                self.provider
                    .persist(&address, &mut container)
                    .map_err(|e| e.boxed())?;
                debug!(record_id = id, "deleted object");
                Ok(DeleteStatus::Ok(id))
            }
            DeleteResult::NotFound => Ok(DeleteStatus::NotExists),
        }
    }

    pub fn exists(&self, object: &O) -> Result<ExistsStatus, Box<dyn PivotspaceError>> {
        let fingerprint = self.pivots.fingerprint(object);
        let address = self.address_function.address(&fingerprint);
        let container = match self.provider.fetch(&address).map_err(|e| e.boxed())? {
            Some(container) => container,
            None => return Ok(ExistsStatus::NotExists),
        };
        let verifier = StoreVerifier::new(object, self.objects.as_ref());
        match container
            .exists(&fingerprint, &verifier)
            .map_err(|e| e.boxed())?
        {
            ExistsResult::Exists(id) => Ok(ExistsStatus::Exists(id)),
            ExistsResult::NotExists => Ok(ExistsStatus::NotExists),
        }
    }

    /// Range search: routes the query window to every candidate address and
    /// scans each container with triangle-inequality pruning. Returns the
    /// total number of real distance computations, the cost metric pruning
    /// exists to shrink.
    pub fn search(
        &self,
        object: &O,
        radius: T,
        collector: &mut dyn ResultCollector<T>,
    ) -> Result<u64, Box<dyn PivotspaceError>> {
        let query = RangeQuery::new(self.pivots.fingerprint(object), radius);
        let verifier = StoreVerifier::new(object, self.objects.as_ref());
        let mut computations = 0u64;
        for address in self.address_function.addresses_in_window(&query.window) {
            if let Some(container) = self.provider.fetch(&address).map_err(|e| e.boxed())? {
                computations += container
                    .search(&query, &verifier, collector)
                    .map_err(|e| e.boxed())?;
            }
        }
        trace!(computations, "range search complete");
        Ok(computations)
    }
}
