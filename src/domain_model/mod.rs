mod key;
mod session;
mod token;
mod user;

pub use key::*;
pub use session::*;
pub use token::*;
pub use user::*;
