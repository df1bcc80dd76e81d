//! Gallery domain services.
//!
//! `PhotoStore` is the only writer of photo rows. Uploads and gallery syncs
//! go through it, and product deletion hands it the cascade.

pub mod catalog;
pub mod gallery_sync;
pub mod photo_store;
pub mod upload_ingestion;

pub use catalog::{CatalogService, NewProduct};
pub use gallery_sync::{GalleryViolation, PhotoUpdate};
pub use photo_store::{PhotoStore, RemovedPhoto};
pub use upload_ingestion::{IncomingUpload, IngestionReport, UploadIngestion, UploadLimits};
