//! Entry payload decompression
//!
//! MTF archives use a single custom codec; there is no write path, the
//! game's tooling produced the archives.

pub mod lz;

pub use lz::decompress;
