// src/lib.rs

pub mod decode;
pub mod record;
pub mod session;
pub mod transport;
