//! Image classification
//!
//! Every image gets exactly one category. Public images are split by their
//! `cw_*` provenance properties, private ones by ownership. The snapshot tag
//! is independent of the category.

use crate::resource::model::Image;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageCategory {
    /// Public provider image carrying `cw_haas=haas`
    Haas,
    /// Public provider image belonging to an orchestration bundle
    Orchestration,
    /// Any other public provider image
    Cloudwatt,
    /// Public image from someone else
    Community,
    /// Private image owned by the requesting project
    Project,
    /// Private image shared with the requesting project
    Shared,
}

impl ImageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Haas => "haas",
            Self::Orchestration => "orchestration",
            Self::Cloudwatt => "cloudwatt",
            Self::Community => "community",
            Self::Project => "project",
            Self::Shared => "shared",
        }
    }
}

impl fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorize an image as seen from `project_id`. First matching rule wins.
pub fn categorize(image: &Image, project_id: &str) -> ImageCategory {
    if image.is_public() {
        let from_provider = image
            .property("cw_origin")
            .is_some_and(|origin| origin.eq_ignore_ascii_case("cloudwatt"));

        if !from_provider {
            return ImageCategory::Community;
        }
        if image
            .property("cw_haas")
            .is_some_and(|haas| haas.trim().eq_ignore_ascii_case("haas"))
        {
            return ImageCategory::Haas;
        }
        // cw_bundle takes several values, any of them counts
        if image.property("cw_bundle").is_some_and(|b| !b.is_empty()) {
            return ImageCategory::Orchestration;
        }
        return ImageCategory::Cloudwatt;
    }

    if image.owner.as_deref() == Some(project_id) {
        ImageCategory::Project
    } else {
        ImageCategory::Shared
    }
}

/// Whether the image was taken from a server rather than uploaded
pub fn is_snapshot(image: &Image) -> bool {
    image.property("image_type") == Some("snapshot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::model::Visibility;

    const PROJECT: &str = "p-42";

    fn image(public: bool, owner: &str, props: &[(&str, &str)]) -> Image {
        Image {
            id: "img".to_string(),
            visibility: if public {
                Visibility::Public
            } else {
                Visibility::Private
            },
            owner: Some(owner.to_string()),
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    /// Test provider image tagged haas is classified haas
    #[test]
    fn test_public_haas() {
        let img = image(true, "cw", &[("cw_origin", "CloudWatt"), ("cw_haas", "HAAS ")]);
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Haas);
    }

    /// Test provider image with a bundle is classified orchestration
    #[test]
    fn test_public_orchestration() {
        let img = image(true, "cw", &[("cw_origin", "cloudwatt"), ("cw_bundle", "anything")]);
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Orchestration);
    }

    /// Test haas tag takes precedence over a bundle
    #[test]
    fn test_haas_wins_over_bundle() {
        let img = image(
            true,
            "cw",
            &[("cw_origin", "cloudwatt"), ("cw_haas", "haas"), ("cw_bundle", "x")],
        );
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Haas);
    }

    /// Test plain provider image is classified cloudwatt
    #[test]
    fn test_public_cloudwatt() {
        let img = image(true, "cw", &[("cw_origin", "cloudwatt")]);
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Cloudwatt);

        let img = image(true, "cw", &[("cw_origin", "cloudwatt"), ("cw_haas", "no"), ("cw_bundle", "")]);
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Cloudwatt);
    }

    /// Test public image from another origin is classified community
    #[test]
    fn test_public_community() {
        let img = image(true, PROJECT, &[]);
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Community);

        let img = image(true, "x", &[("cw_origin", "elsewhere"), ("cw_haas", "haas")]);
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Community);
    }

    /// Test private images split by owner
    #[test]
    fn test_private_project_and_shared() {
        assert_eq!(categorize(&image(false, PROJECT, &[]), PROJECT), ImageCategory::Project);
        assert_eq!(categorize(&image(false, "other", &[]), PROJECT), ImageCategory::Shared);

        // Provenance properties are ignored on private images
        let img = image(false, "other", &[("cw_origin", "cloudwatt")]);
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Shared);
    }

    /// Test snapshot tag does not change the category
    #[test]
    fn test_snapshot_flag_is_independent() {
        let img = image(false, PROJECT, &[("image_type", "snapshot")]);
        assert!(is_snapshot(&img));
        assert_eq!(categorize(&img, PROJECT), ImageCategory::Project);

        assert!(!is_snapshot(&image(false, PROJECT, &[("image_type", "image")])));
        assert!(!is_snapshot(&image(true, PROJECT, &[])));
    }
}
