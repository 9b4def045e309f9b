// docsearch-cache - fuzzy-matching cache in front of a documentation search API
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod search;
pub mod server;
pub mod tools;
pub mod utils;
