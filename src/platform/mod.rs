//! Upstream API client, player-script analysis and URL resolution

pub mod cipher;
pub mod client;
pub mod formats;
pub mod innertube;
pub mod lexer;
pub mod resolver;
pub mod script;

#[cfg(test)]
pub mod testing;

pub use cipher::{DecipherAction, DecipherProgram};
pub use client::{HttpClientConfig, HttpSession, Transport};
pub use innertube::PlayerResponseResolver;
pub use resolver::UrlResolver;
pub use script::ScriptAnalyzer;
