//! wallcap core: capture a wallpaper through an instrumented browser.
//!
//! A [`session::DownloadSession`] drives one page over the DevTools protocol:
//! it rewrites the photo API request, picks a photo from the response, finds
//! or triggers the image request, converts the body and writes it to disk.

pub mod cdp;
pub mod config;
pub mod connection;
pub mod convert;
pub mod error;
pub mod intercept;
pub mod ledger;
pub mod logging;
pub mod resolver;
pub mod select;
pub mod session;
pub mod storage;
pub mod url_model;

pub use error::CaptureError;
