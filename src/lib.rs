//! In-memory book catalogue.
//!
//! Layers: `domain` (Book, validation, repository trait) → `application`
//! (BookService) → `infra` (in-memory Store) → `interface` (HTTP, MCP).

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod interface;
