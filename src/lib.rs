//! Sift — content classification and entity extraction for a CRM.
//!
//! Takes unstructured input (pasted text, an uploaded document, an email
//! body), decides which business records it describes (tasks, contacts,
//! vendors, expenses), extracts their fields, and writes them without
//! creating duplicates. A deterministic fallback keeps the pipeline working
//! when the language model is unavailable or returns unusable output.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod extractors;
pub mod normalize;

pub mod attachments;
pub mod classifier;
pub mod providers;

pub mod materializer;
pub mod store;

pub mod pipeline;
pub mod server;
