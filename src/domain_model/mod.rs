mod media;
mod session;
mod subject;
mod token;

pub use media::*;
pub use session::*;
pub use subject::*;
pub use token::*;
