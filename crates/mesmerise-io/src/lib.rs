pub mod decode;
pub mod error;
pub mod export;
pub mod probe;
