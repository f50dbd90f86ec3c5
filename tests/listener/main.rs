//! End-to-end tests of the listener pipeline
//!
//! Frames are built byte-for-byte and fed through `RaListener`; routes are
//! recorded by a fake mutator or written out by a real script.

mod properties;
mod scenarios;
mod script;
mod support;
