// Publishing: latest transformed artifact -> published artifact + sidecar

pub mod publisher;

pub use publisher::{find_latest_transformed, PublishedArtifact, Publisher};
