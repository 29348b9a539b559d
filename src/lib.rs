pub mod builder;
pub mod cli;
pub mod cosmetic;
pub mod encoder;
pub mod error;
pub mod format;
pub mod matcher;
pub mod patcher;
pub mod profile;
pub mod segment;
pub mod signature;

pub use error::PatchError;
pub use patcher::{patch_image, run, run_with_builder};
