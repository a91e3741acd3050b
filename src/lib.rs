#![allow(clippy::op_ref)]

pub mod backend;
pub mod logging;
pub mod util;

pub use halo2_curves;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    InvalidFormat(String),
    InvalidKey(String),
    InvalidWitness(String),
    InvalidSnark(String),
    Serialization(String),
}
