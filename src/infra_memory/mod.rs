mod session_repo_memory;

pub use session_repo_memory::*;
