//! Marginalia server
//!
//! Content-addressed text anchors for annotating rendered documents, with
//! import of exported annotation sets and a relay to an external text
//! analysis service.

pub mod analysis;
pub mod anchors;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
