#![allow(
	clippy::precedence, // Personal opinion
	clippy::len_without_is_empty, // Menus are never empty
)]

pub mod action;
pub mod arena;
pub mod bot;
pub mod command;
pub mod error;
pub mod opening;
pub mod parallel;
pub mod policy;
pub mod rules;
pub mod search;
pub mod snapshot;
pub mod state;
