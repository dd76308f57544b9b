pub mod jwt;
pub mod password;
pub mod middleware;
pub mod cookie;

pub use jwt::*;
pub use password::*;
pub use middleware::*;
pub use cookie::*;
