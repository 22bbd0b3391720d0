pub mod archive;
pub mod asset;
pub mod cache;
pub mod cleanup;
pub mod download;
pub mod github;
pub mod http;
pub mod install;
pub mod platform;
pub mod runtime;
pub mod setup;
pub mod ui;
