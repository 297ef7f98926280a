pub mod guard;
pub mod jwt;
pub mod password;
pub mod session;

pub use guard::{authorize, ADMIN_ONLY, FACULTY, SIGNED_IN, STAFF};
pub use jwt::{JwtKeys, SessionClaims};
pub use session::{Session, SessionCookies};
