//! roaster - team matchmaking service
//!
//! Teams publish weekly availability, find opponents of similar skill,
//! exchange match requests and chat about accepted games.

pub mod auth;
pub mod cli;
pub mod http_server;
pub mod observability;
pub mod storage;
pub mod teams;
