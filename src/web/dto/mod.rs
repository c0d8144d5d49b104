//! Data transfer objects for the HTTP API.

mod request;
mod response;
mod validation;

pub use request::*;
pub use response::*;
pub use validation::*;
