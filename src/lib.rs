//! Modelgate - a minimal HTTP gateway that routes chat requests to hosted
//! LLM providers and relays their responses as a UI message-part stream.

pub mod config;
pub mod handlers;
pub mod llm;
pub mod response;
pub mod server;
