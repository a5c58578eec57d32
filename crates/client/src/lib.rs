//! Client for the remote contact-import endpoints.
//!
//! [`backend::ImportBackend`] is the seam the wizard talks to;
//! [`http::HttpImportClient`] implements it over HTTP with [`reqwest`].

pub mod backend;
pub mod config;
pub mod error;
pub mod file;
pub mod http;
pub mod wire;

pub use backend::ImportBackend;
pub use config::ClientConfig;
pub use error::ApiError;
pub use file::SpreadsheetFile;
pub use http::HttpImportClient;
