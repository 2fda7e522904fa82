//! GitGram - a Telegram bot that relays GitHub repository events to chats.
//!
//! The crate is organized around three coupled pieces: webhook ingestion and
//! fan-out ([`ingress`], [`dispatch`]), the subscription lifecycle
//! ([`subscriptions`]), and GitHub account linking ([`accounts`]). Everything
//! else is plumbing around them: persistence ([`storage`]), the GitHub and
//! Telegram API clients ([`github`], [`telegram`]), the HTTP server
//! ([`server`]), and the chat command surface ([`commands`]).

pub mod accounts;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod github;
pub mod ingress;
pub mod server;
pub mod storage;
pub mod subscriptions;
pub mod telegram;
pub mod types;
pub mod webhooks;
