//! AppDir bundling library.
//!
//! Turns a prepared AppDir staging directory into a relocatable,
//! self-contained bundle. The pipeline lives in `deploy` and leans on:
//! - `appdir`: staging-directory discovery.
//! - `inspect`: binary-object identification and dependency extraction.
//! - `resolve`: library-name resolution against the search directories.
//! - `closure`: transitive dependency closure over staged trees.
//! - `auxiliary`: companion data/plugin trees of known toolkits.
//! - `relocate`: AppDir mirroring and origin-relative search-path rewrite.
//! - `loader`: dynamic-loader bundling and neutralization.
//! - `apprun`: the launcher script artifact.
//! - `copyright`: copyright-file lookup through the host package manager.

pub mod appdir;
pub mod apprun;
pub mod auxiliary;
pub mod closure;
pub mod config;
pub mod context;
pub mod copyright;
pub mod deploy;
pub mod fsutil;
pub mod inspect;
pub mod loader;
pub mod paths;
pub mod relocate;
pub mod resolve;
