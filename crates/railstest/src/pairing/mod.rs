//
// pairing/mod.rs
//
// Source <-> test file pairing for Rails-style project trees
//

pub mod config;
pub mod directory_index;
pub mod path_match;
pub mod resolve;


pub use config::*;
pub use directory_index::*;
pub use path_match::*;
pub use resolve::*;
