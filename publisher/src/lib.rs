//! Release publisher library.
//!
//! This crate drives the publication of a tagged pre-release: it checks the
//! release is still awaiting publication, builds the archives with an
//! external packager, writes and signs a SHA-256 checksum file, uploads the
//! artefacts and garbage-collects pre-releases abandoned by earlier failed
//! runs. It is used by the `release-publisher` CLI binary.
//!
//! # Modules
//!
//! - [`bundle`] - Artefact naming, manifest staging and checksum assembly
//! - [`checksum`] - SHA-256 digests and the checksum manifest
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - Typed tool invocations and the executor seam
//! - [`config`] - Settings file and environment resolution
//! - [`eligibility`] - Pre-release eligibility check
//! - [`error`] - Error taxonomy and operator-facing categories
//! - [`gc`] - Garbage collection of abandoned pre-releases
//! - [`hosting`] - Release-hosting adapter (`gh`)
//! - [`lock`] - Run lock preventing overlapping publishes
//! - [`output`] - Progress lines and dry-run formatting
//! - [`packager`] - Cross-compilation packager adapter
//! - [`pipeline`] - Stage sequencing
//! - [`promotion`] - Upload, latest marker and sentinel removal
//! - [`release`] - Release, asset and timestamp model
//! - [`signing`] - GPG adapter and signing-identity resolution
//! - [`tag`] - Release tag validation
//! - [`vcs`] - Version-control adapter (`git`)

pub mod bundle;
pub mod checksum;
pub mod cli;
pub mod command;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod gc;
pub mod hosting;
pub mod lock;
pub mod output;
pub mod packager;
pub mod pipeline;
pub mod promotion;
pub mod release;
pub mod signing;
pub mod tag;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod vcs;
