// src/config/mod.rs
pub mod uplink;

pub use uplink::UplinkConfig;
