// handlers/protected/mod.rs - bearer token required (/api/*)
//
// Every route here sits behind jwt_auth_middleware, so handlers can rely on an
// AuthUser extension carrying the caller's subject id.

pub mod chat;
pub mod nft;
pub mod todos;

pub use todos::*;
