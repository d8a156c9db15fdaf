//! Named storage buckets that hold uploaded images.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// One bucket per asset category.
///
/// The string form (`project-images`, ...) is both the on-disk directory name
/// and the path segment used in public URLs.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    ProjectImages,
    CertificateImages,
    SkillIcons,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [
        Bucket::ProjectImages,
        Bucket::CertificateImages,
        Bucket::SkillIcons,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::ProjectImages => "project-images",
            Bucket::CertificateImages => "certificate-images",
            Bucket::SkillIcons => "skill-icons",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown bucket `{0}`")]
pub struct UnknownBucket(pub String);

impl FromStr for Bucket {
    type Err = UnknownBucket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == s)
            .ok_or_else(|| UnknownBucket(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_names() {
        assert_eq!("skill-icons".parse::<Bucket>(), Ok(Bucket::SkillIcons));
        assert_eq!(
            "project-images".parse::<Bucket>(),
            Ok(Bucket::ProjectImages)
        );
        let err = "photos".parse::<Bucket>().unwrap_err();
        assert_eq!(err.to_string(), "unknown bucket `photos`");
    }

    #[test]
    fn serializes_as_kebab_case() {
        let json = serde_json::to_string(&Bucket::CertificateImages).unwrap();
        assert_eq!(json, "\"certificate-images\"");
    }
}
