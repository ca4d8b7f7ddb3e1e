//! GitHub integration for tooling downloads and release publishing

mod client;
mod release_manager;

pub use client::{Asset, GitHubClient, NewRelease, Release, ReleaseSelector};
pub use release_manager::{GitHubPublisher, GitHubReleaseConfig};
