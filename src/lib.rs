//! Voice Agent Demo — turns a prospect's website into a live phone assistant.

pub mod assistant;
pub mod call;
pub mod config;
pub mod error;
pub mod llm;
pub mod notify;
pub mod profile;
pub mod web;
pub mod workflow;
