pub mod address;
pub mod cacheable;
pub mod distance_value;
pub mod fingerprint;
pub mod partitioned_mutex;
pub mod search;

pub use address::*;
pub use cacheable::*;
pub use distance_value::*;
pub use fingerprint::*;
pub use partitioned_mutex::*;
pub use search::*;
