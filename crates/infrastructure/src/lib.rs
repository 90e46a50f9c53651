//! rsdns infrastructure: the cache, server registry, recursive resolver,
//! DNSSEC validation, block list, upstream transports and listeners.
pub mod dns;
