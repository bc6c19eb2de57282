//! seekchat: a terminal chat client for search-augmented AI backends.
//!
//! The interesting part lives under [`core`]: turning a loosely-framed byte
//! stream of mixed payload shapes into an ordered, sanitized, incrementally
//! rendered document. [`ui`] holds the markdown document model and a minimal
//! terminal surface; [`api`] the request/response types.

pub mod api;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
