pub mod persistence;
pub mod song;
