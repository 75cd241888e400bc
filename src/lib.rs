pub mod error;
pub mod wire;


type Result<T> = std::result::Result<T, error::Error>;
