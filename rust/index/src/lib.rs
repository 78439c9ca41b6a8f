pub mod address_function;
pub mod bucket_index;
pub mod collector;
pub mod config;
pub mod metric;
pub mod objects;

pub use address_function::{AddressFunction, LeadingDimensionPartitioner, SingleBucket};
pub use bucket_index::{BucketIndex, DeleteStatus, ExistsStatus, IndexConfigError, InsertStatus};
pub use collector::{KnnCollector, RangeCollector};
pub use config::BucketIndexConfig;
pub use metric::{MetricObject, PivotSet};
pub use objects::{GetObjectError, InMemoryObjectStore, ObjectStore, StoreVerifier};
