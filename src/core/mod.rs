// Core modules implementing the decode strategies and error modeling.
pub mod decoder;
pub mod error;
