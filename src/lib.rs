//! Client-side browsing engine for S3-compatible object stores.

pub mod adapters;
pub mod browser;
pub mod model;
pub mod presign;
pub mod transfer;
pub mod util;

pub use browser::{build_bucket_listing, ClientFactory, S3Browser, PAGE_SIZE};
pub use model::listing::{BucketListing, ListOptions, ObjectPage};
pub use model::object::{ConnectionParams, ObjectDetails, TransferTuning};
pub use model::BrowseError;
pub use presign::{PostKeyMode, PresignMethod, PresignRequest, PresignedPost, PresignedResult};
pub use transfer::{CancelFn, ProgressFn};
