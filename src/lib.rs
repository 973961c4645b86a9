//! Dubflow - Guided Video Dubbing Workflow
//!
//! Walks a video through upload, target language selection, remote
//! processing and download. The processing step shows phased progress
//! while a single backend call does the real work.

pub mod cli;
pub mod config;
pub mod error;
pub mod session;
pub mod steps;
pub mod processing;
pub mod workflow;
pub mod wizard;
