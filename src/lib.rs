//! Client for the obesity-risk prediction service: predictions, result
//! rendering, recommendations, and a streaming health-assistant chat with
//! locally persisted history.

pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod logging;
pub mod markup;
pub mod predict;
pub mod render;
pub mod status;
pub mod storage;
