//! Shared utility modules used across Tessera components.

pub mod line;
