// ─── LaunchCore ───
// Turns a version id into a verified set of local files and a ready command line.
//
// Architecture:
//   core/
//     store       : on-disk layout, hashing, atomic writes
//     rules       : allow/disallow evaluation for libraries and arguments
//     maven/      : coordinate parsing and path/URL derivation
//     version/    : descriptor model, inheritance resolver, remote manifest
//     catalog     : descriptor libraries to concrete paths for this platform
//     downloader/ : worker pool with SHA-1 verification, retry, cancellation
//     auth/       : credential bundle consumed by argument assembly
//     launch/     : natives, classpath, arguments, runtime assembler

pub mod auth;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod launch;
pub mod maven;
pub mod rules;
pub mod store;
pub mod version;
