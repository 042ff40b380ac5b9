// Library exports for flakedeps
pub mod cache;
pub mod cli;
pub mod config;
pub mod datasource;
pub mod dependency;
pub mod http;
pub mod lockfile;
pub mod nix;
pub mod output;
