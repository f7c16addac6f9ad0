//! Sidecar configuration files of the tools.
//!
//! Every tool reads a small file from the working directory (`txyz.json`, `pxyz.json`,
//! ...). JSON is the default; a `.toml` extension switches to TOML. `-S KEY=VALUE`
//! overrides are applied to the parsed document before it is deserialised, so they go
//! through the same validation as the file itself.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;
