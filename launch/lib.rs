#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod config;
pub mod metadata;
pub mod naming;
pub mod ram;
pub mod submit;
pub mod workflows;

#[path = "../shared/api.rs"]
pub mod shared_api;
#[path = "../shared/files.rs"]
pub mod shared_files;
#[cfg(test)]
#[path = "../shared/fixtures.rs"]
pub mod shared_fixtures;
pub mod shared {
    pub use super::shared_api as api;
    pub use super::shared_files as files;
    #[cfg(test)]
    pub use super::shared_fixtures as fixtures;
}

#[path = "../eval/mod.rs"]
pub mod eval;
