//! voxloop is a voice assistant harness built around a persistent
//! conversation log with a pinned system prompt. The log is bounded by a
//! retention policy, survives process restarts through per-session JSON
//! records, and feeds an OpenAI chat provider with retry and backoff.
//! Speech synthesis and transcription are optional front ends to the same
//! conversation core.

pub mod chat;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod providers;
pub mod repl;
pub mod utils;
pub mod voice;
