mod auth_service;
mod media_error;
mod token_service;

pub use auth_service::*;
pub use media_error::*;
pub use token_service::*;
