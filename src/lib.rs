// Authoritative server for the king-of-the-hill zone mode: one task per
// match owns the zone state, everyone else renders its broadcasts.

pub mod domain;
pub mod use_cases;
pub mod interface_adapters;
pub mod frameworks;

pub use frameworks::server::run;
