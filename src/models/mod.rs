pub mod announce;
pub mod peer;
