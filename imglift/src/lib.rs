//! imglift — stream disk images into a virtualization engine's storage domain.
//!
//! The library drives three cooperating protocols: the management-plane REST
//! API for resource lifecycle (disk creation, image transfers, finalization),
//! the data-plane HTTP endpoint for the byte stream, and the qcow header for
//! the image's virtual size. [`upload_image`] runs the whole sequence.
//!
//! ```ignore
//! use imglift::{EngineClient, EngineOptions, UploadOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = EngineClient::new(
//!         &EngineOptions::new("https://engine.example.com/api")
//!             .with_credentials("admin@internal", "secret"),
//!     )?;
//!     let outcome = imglift::upload_image(
//!         &engine,
//!         &UploadOptions::new("/var/images/guest.qcow2", "sd-1"),
//!     )
//!     .await?;
//!     println!("disk {}", outcome.disk_id);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod errors;
pub mod options;
pub mod qcow;
pub mod source;
pub mod transfer;
pub mod wait;

pub use engine::{ApiError, EngineClient, EngineOptions};
pub use errors::{UploadError, UploadResult};
pub use options::UploadOptions;
pub use source::SourceImage;
pub use transfer::{UploadOutcome, upload_image};

/// imglift library version (from CARGO_PKG_VERSION at compile time).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
