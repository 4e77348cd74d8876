mod jwt_codec;
mod session_manager_impl;

pub use jwt_codec::*;
pub use session_manager_impl::*;
