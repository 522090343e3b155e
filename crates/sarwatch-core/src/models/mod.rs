//! Catalog domain models.

pub mod event;
pub mod granule;
pub mod product;
pub mod status;
pub mod timestamp;

pub use event::{Event, ProcessingTimeframe};
pub use granule::{Granule, SearchGranule};
pub use product::{Product, ProductFiles};
pub use status::StatusCode;
