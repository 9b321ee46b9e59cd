//! Device protocols

pub mod palazzetti;
