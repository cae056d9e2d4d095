pub mod domain;
pub mod error;
pub mod matching;
pub mod protocol;
