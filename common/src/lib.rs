#![allow(
	clippy::precedence, // Personal opinion
)]

pub mod bits;
pub mod pair;
pub mod params;
