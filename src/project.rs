use super::*;

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Project record as served by `/api/projects/<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_slug: String,
    #[serde(default)]
    pub origin_url: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub versions: Vec<ProjectVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectVersion {
    #[serde(default)]
    pub id: String,
    pub version: String,
    pub version_slug: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub has_docs: bool,
}

impl Project {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::ProjectParse(err.to_string()))
    }

    /// Looks a version up by its label.
    pub fn version(&self, label: &str) -> Option<&ProjectVersion> {
        self.versions.iter().find(|version| version.version == label)
    }

    /// Versions that have uploaded documentation, in listing order.
    pub fn documented_versions(&self) -> impl Iterator<Item = &ProjectVersion> {
        self.versions.iter().filter(|version| version.has_docs)
    }
}

pub(crate) static SLUG_PATTERN: LazyLock<std::result::Result<fancy_regex::Regex, String>> =
    LazyLock::new(|| {
        fancy_regex::Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").map_err(|err| err.to_string())
    });

fn validate_slug(kind: &'static str, slug: &str) -> Result<()> {
    let pattern = SLUG_PATTERN
        .as_ref()
        .map_err(|err| Error::InvalidConfig(err.clone()))?;
    let matches = pattern
        .is_match(slug)
        .map_err(|err| Error::InvalidConfig(err.to_string()))?;
    // `a..b` passes the character class but still climbs a directory.
    if !matches || slug.contains("..") {
        return Err(Error::InvalidSlug {
            kind,
            slug: slug.to_string(),
        });
    }
    Ok(())
}

/// Path of the version's entry document on the portal's static server,
/// e.g. `/docs/my-project/1-2-0/index.html`.
pub fn entry_document_path(
    config: &ViewerConfig,
    project: &Project,
    version: &ProjectVersion,
) -> Result<String> {
    validate_slug("project", &project.name_slug)?;
    validate_slug("version", &version.version_slug)?;
    let root = config.docs_root.trim_end_matches('/');
    Ok(format!(
        "{root}/{}/{}/{}",
        project.name_slug, version.version_slug, config.entry_document
    ))
}
