mod session;

pub use session::SessionManager;
pub use session::{EXPIRED_GRACE_SECS, MAX_SESSIONS, PENDING_TTL_SECS, SESSION_COOKIE};
