pub mod response;

pub use response::{AppError, ErrorKind};
