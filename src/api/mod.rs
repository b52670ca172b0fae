mod cookie;
mod error;
mod gate;
mod handler;
mod media;
mod router;

pub use cookie::CookiePolicy;
pub use error::{ApiErrorCode, MessageBody, recover_error};
pub use router::{cors, routes};
