// keepalive-mobile — Native mobile bindings for iOS and Android
// This crate exports the keep-alive supervisor API via UniFFI

pub use keepalive_core::*;
