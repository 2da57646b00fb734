//! Parsing of `<engine> images` output.

use crate::error::{ReleaseError, Result};

/// Go template passed to `images --format`, understood by both docker and podman
pub const LISTING_FORMAT: &str = "{{.Repository}}\t{{.Tag}}\t{{.ID}}\t{{.Size}}";

/// One row of the image listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    /// Repository, e.g. `quay.io/acme/app`
    pub repository: String,
    /// Tag, `<none>` for dangling images
    pub tag: String,
    /// Short image ID
    pub id: String,
    /// Human-readable size as printed by the engine
    pub size: String,
}

impl ImageSummary {
    /// `repository:tag`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

/// Parse tab-separated rows produced with [`LISTING_FORMAT`].
///
/// Blank lines are skipped. A row without all four columns is an error.
pub fn parse_listing(repository: &str, output: &str) -> Result<Vec<ImageSummary>> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut columns = line.split('\t').map(str::trim);
            match (
                columns.next(),
                columns.next(),
                columns.next(),
                columns.next(),
            ) {
                (Some(repo), Some(tag), Some(id), Some(size)) if !repo.is_empty() => {
                    Ok(ImageSummary {
                        repository: repo.to_string(),
                        tag: tag.to_string(),
                        id: id.to_string(),
                        size: size.to_string(),
                    })
                }
                _ => Err(ReleaseError::Listing {
                    repository: repository.to_string(),
                    reason: format!("Unexpected listing row: '{line}'"),
                }),
            }
        })
        .collect()
}
