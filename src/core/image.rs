//! Image reference parsing

use crate::docker::Container;
use std::collections::BTreeSet;

const DEFAULT_REGISTRY: &str = "docker.io";

/// Split a reference into `(registry, remainder)` the way the Docker CLI does
fn split_registry(reference: &str) -> (&str, &str) {
    match reference.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first, rest)
        }
        _ => (DEFAULT_REGISTRY, reference),
    }
}

/// Resolve a repo tag into the bare image name providers match against.
///
/// `docker.io/library/postgres:14-alpine` and `postgres:14-alpine` both
/// resolve to `postgres`; `ghcr.io/owner/app:latest` resolves to `owner/app`.
pub fn image_name(reference: &str) -> String {
    let (registry, repository) = split_registry(reference.trim());
    let repository = match repository.split_once('@') {
        Some((name, _digest)) => name,
        None => repository,
    };
    let repository = match repository.split_once(':') {
        Some((name, _tag)) => name,
        None => repository,
    };
    // Official images live under `library/` on Docker Hub only
    if registry == DEFAULT_REGISTRY {
        repository
            .strip_prefix("library/")
            .unwrap_or(repository)
            .to_string()
    } else {
        repository.to_string()
    }
}

/// All image names a container is known by
pub fn container_names(container: &Container) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = container
        .image_tags
        .iter()
        .map(|tag| image_name(tag))
        .filter(|name| !name.is_empty())
        .collect();

    // Untagged images (e.g. after a re-pull) still carry the reference the
    // container was created from
    if names.is_empty() && !container.image_ref.is_empty() {
        names.insert(image_name(&container.image_ref));
    }

    names
}
