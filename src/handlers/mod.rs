// handlers/mod.rs - two security tiers
//
// Public (no auth): /api banner, /health
// Protected (bearer token): /api/todos, /api/chat, /api/nft
pub mod protected;
pub mod public;
