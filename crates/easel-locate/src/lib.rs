//! easel-locate: finds the easel display unit on the local network.
//!
//! Wraps nmap, ping and ssh to search candidate /24 ranges for the unit,
//! confirms a candidate with an authenticated marker round-trip, and
//! records the verified address in the deploy document that the separate
//! deploy step reads.

pub mod candidates;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod nmap_xml;
pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod scanner;
pub mod verify;
