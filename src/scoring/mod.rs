//! Identification scoring through external programs

pub mod pci;

pub use pci::{make_uid, PciConfig, PciProgram};
