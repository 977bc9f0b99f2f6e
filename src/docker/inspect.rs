//! `docker inspect` JSON documents (only the fields we read)

use crate::docker::{Container, DockerError};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    pub id: String,
    pub name: String,
    /// Image ID (`sha256:...`)
    pub image: String,
    #[serde(default)]
    pub config: Option<ContainerConfig>,
    #[serde(default)]
    pub state: Option<ContainerState>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub running: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInspect {
    pub id: String,
    #[serde(default)]
    pub repo_tags: Option<Vec<String>>,
}

pub fn parse_containers(raw: &[u8]) -> Result<Vec<ContainerInspect>, DockerError> {
    serde_json::from_slice(raw).map_err(|e| DockerError::Parse(format!("container inspect: {}", e)))
}

pub fn parse_images(raw: &[u8]) -> Result<Vec<ImageInspect>, DockerError> {
    serde_json::from_slice(raw).map_err(|e| DockerError::Parse(format!("image inspect: {}", e)))
}

/// Join container and image documents into [`Container`]s.
///
/// Containers that are no longer running are dropped.
pub fn build_containers(
    containers: Vec<ContainerInspect>,
    images: &[ImageInspect],
) -> Vec<Container> {
    let tags_by_image: HashMap<&str, &[String]> = images
        .iter()
        .map(|image| (image.id.as_str(), image.repo_tags.as_deref().unwrap_or_default()))
        .collect();

    containers
        .into_iter()
        .filter(|c| c.state.as_ref().map_or(true, |s| s.running))
        .map(|c| {
            let image_tags = tags_by_image
                .get(c.image.as_str())
                .map(|tags| tags.to_vec())
                .unwrap_or_default();
            Container {
                name: c.name.trim_start_matches('/').to_string(),
                image_ref: c.config.map(|cfg| cfg.image).unwrap_or_default(),
                id: c.id,
                image_tags,
            }
        })
        .collect()
}
