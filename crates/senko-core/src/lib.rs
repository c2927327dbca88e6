//! Core senko library (history engine, content transform, interaction state, backends, config).

pub mod backend;
pub mod chat;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod export;
pub mod history;
pub mod keymap;
pub mod markup;
pub mod sheet;
pub mod view;
