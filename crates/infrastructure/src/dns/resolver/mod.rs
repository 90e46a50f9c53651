//! Recursive resolution.
//!
//! `RecursiveResolver` answers from the response cache when it can and
//! otherwise iterates from the root hints, validating with the DNSSEC
//! chain validator when one is configured.

pub mod config;
pub mod local_addrs;
pub mod recursive;

pub use config::ResolverSettings;
pub use local_addrs::LocalAddresses;
pub use recursive::RecursiveResolver;
