//! Request routing.
//!
//! Every request is routed by its address alone; there is no route table.
//! See [`address`] for how the address is derived.

pub mod address;

pub use address::{Address, InvalidAddress};
