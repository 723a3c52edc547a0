#[allow(clippy::module_inception)]
mod session;
mod session_file;

pub use session::Session;
pub use session_file::ensure_session_dir;
