//! Validation for full-gallery sync submissions.
//!
//! A sync submission describes the desired final state of every photo in a
//! product's gallery. It is checked as a whole against the current gallery
//! and every violated rule is reported, so a client can fix all of them in one
//! round trip. Nothing here touches the database; `PhotoStore::reorder_and_sync`
//! calls [`validate_sync`] inside its transaction before applying anything.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::product_photo;

/// Highest position a photo may hold. Appends past it are refused, so the
/// next position after any stored one always fits in an `i32`.
pub const MAX_POSITION: i32 = 1_000_000;

/// Desired state of one photo in a gallery sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhotoUpdate {
    pub id: Uuid,
    /// 1-based display rank; stored as given
    #[schema(example = 1)]
    pub position: i32,
    pub is_primary: bool,
    /// Replaces the stored description; `null` or blank clears it
    #[serde(default)]
    pub description: Option<String>,
}

/// One rule a sync submission broke
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GalleryViolation {
    #[error("Gallery must have exactly one primary photo (found {found})")]
    PrimaryCount { found: usize },

    #[error("Photo positions must be unique (position {position} is used {} times)", .photo_ids.len())]
    DuplicatePosition { position: i32, photo_ids: Vec<Uuid> },

    #[error("Photo {photo_id} has invalid position {position}; positions start at 1")]
    InvalidPosition { photo_id: Uuid, position: i32 },

    #[error("Photo {photo_id} has position {position}; positions cannot exceed {max}")]
    PositionTooLarge { photo_id: Uuid, position: i32, max: i32 },

    #[error("Photo {photo_id} does not belong to this product")]
    UnknownPhoto { photo_id: Uuid },

    #[error("Photo {photo_id} is listed more than once")]
    DuplicatePhoto { photo_id: Uuid },

    #[error("Photo {photo_id} is missing from the submission")]
    MissingPhoto { photo_id: Uuid },

    #[error("Description of photo {photo_id} exceeds {max} characters")]
    DescriptionTooLong { photo_id: Uuid, max: usize },
}

impl GalleryViolation {
    /// Machine-readable rule name
    pub fn rule(&self) -> &'static str {
        match self {
            Self::PrimaryCount { .. } => "exactly_one_primary",
            Self::DuplicatePosition { .. } => "unique_positions",
            Self::InvalidPosition { .. } => "positive_position",
            Self::PositionTooLarge { .. } => "position_limit",
            Self::UnknownPhoto { .. } => "photo_belongs_to_product",
            Self::DuplicatePhoto { .. } => "unique_photo_ids",
            Self::MissingPhoto { .. } => "full_coverage",
            Self::DescriptionTooLong { .. } => "description_length",
        }
    }

    /// Request field the rule applies to
    pub fn field(&self) -> String {
        match self {
            Self::PrimaryCount { .. } | Self::DuplicatePosition { .. } | Self::MissingPhoto { .. } => {
                "photos".to_string()
            }
            Self::InvalidPosition { photo_id, .. } | Self::PositionTooLarge { photo_id, .. } => {
                format!("photos[{}].position", photo_id)
            }
            Self::UnknownPhoto { photo_id } | Self::DuplicatePhoto { photo_id } => {
                format!("photos[{}].id", photo_id)
            }
            Self::DescriptionTooLong { photo_id, .. } => {
                format!("photos[{}].description", photo_id)
            }
        }
    }
}

/// Checks a sync submission against the product's current photos.
///
/// The submission must list every current photo exactly once, mark exactly
/// one of them primary, and give each a distinct position in
/// `1..=MAX_POSITION`. Gaps in the positions are allowed. An empty submission for an empty gallery is valid.
pub fn validate_sync(
    current: &[product_photo::Model],
    updates: &[PhotoUpdate],
    description_max_len: usize,
) -> Result<(), Vec<GalleryViolation>> {
    let mut violations = Vec::new();

    let known: HashSet<Uuid> = current.iter().map(|photo| photo.id).collect();
    let mut seen = HashSet::with_capacity(updates.len());
    let mut by_position: BTreeMap<i32, Vec<Uuid>> = BTreeMap::new();

    for update in updates {
        if !known.contains(&update.id) {
            violations.push(GalleryViolation::UnknownPhoto { photo_id: update.id });
        }
        if !seen.insert(update.id) {
            violations.push(GalleryViolation::DuplicatePhoto { photo_id: update.id });
        }
        if update.position < 1 {
            violations.push(GalleryViolation::InvalidPosition {
                photo_id: update.id,
                position: update.position,
            });
        } else if update.position > MAX_POSITION {
            violations.push(GalleryViolation::PositionTooLarge {
                photo_id: update.id,
                position: update.position,
                max: MAX_POSITION,
            });
        }
        if let Some(description) = &update.description {
            if description.trim().chars().count() > description_max_len {
                violations.push(GalleryViolation::DescriptionTooLong {
                    photo_id: update.id,
                    max: description_max_len,
                });
            }
        }
        by_position.entry(update.position).or_default().push(update.id);
    }

    for photo in current {
        if !seen.contains(&photo.id) {
            violations.push(GalleryViolation::MissingPhoto { photo_id: photo.id });
        }
    }

    if !(current.is_empty() && updates.is_empty()) {
        let found = updates.iter().filter(|update| update.is_primary).count();
        if found != 1 {
            violations.push(GalleryViolation::PrimaryCount { found });
        }
    }

    for (position, photo_ids) in by_position {
        if photo_ids.len() > 1 {
            violations.push(GalleryViolation::DuplicatePosition { position, photo_ids });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn photo(position: i32, is_primary: bool) -> product_photo::Model {
        product_photo::Model {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            path: format!("products/{}.jpg", Uuid::new_v4()),
            description: None,
            is_primary,
            position,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn update(photo: &product_photo::Model, position: i32, is_primary: bool) -> PhotoUpdate {
        PhotoUpdate {
            id: photo.id,
            position,
            is_primary,
            description: None,
        }
    }

    fn rules(violations: &[GalleryViolation]) -> Vec<&'static str> {
        violations.iter().map(GalleryViolation::rule).collect()
    }

    #[test]
    fn accepts_valid_reorder() {
        let current = vec![photo(1, true), photo(2, false), photo(3, false)];
        let updates = vec![
            update(&current[0], 3, false),
            update(&current[1], 1, true),
            update(&current[2], 2, false),
        ];
        assert_eq!(validate_sync(&current, &updates, 255), Ok(()));
    }

    #[test]
    fn accepts_gaps_in_positions() {
        let current = vec![photo(1, true), photo(2, false)];
        let updates = vec![update(&current[0], 1, true), update(&current[1], 5, false)];
        assert!(validate_sync(&current, &updates, 255).is_ok());
    }

    #[test]
    fn empty_submission_for_empty_gallery_is_valid() {
        assert!(validate_sync(&[], &[], 255).is_ok());
    }

    #[rstest]
    #[case(true, true, 2)]
    #[case(false, false, 0)]
    fn rejects_wrong_primary_count(#[case] first: bool, #[case] second: bool, #[case] found: usize) {
        let current = vec![photo(1, true), photo(2, false)];
        let updates = vec![update(&current[0], 1, first), update(&current[1], 2, second)];

        let violations = validate_sync(&current, &updates, 255).unwrap_err();
        assert_eq!(violations, vec![GalleryViolation::PrimaryCount { found }]);
        assert!(violations[0]
            .to_string()
            .contains("exactly one primary photo"));
    }

    #[test]
    fn reports_both_primary_and_position_rules() {
        let current = vec![photo(1, true), photo(2, false)];
        let updates = vec![update(&current[0], 1, true), update(&current[1], 1, true)];

        let violations = validate_sync(&current, &updates, 255).unwrap_err();
        assert_eq!(rules(&violations), vec!["exactly_one_primary", "unique_positions"]);
        match &violations[1] {
            GalleryViolation::DuplicatePosition { position, photo_ids } => {
                assert_eq!(*position, 1);
                assert_eq!(photo_ids, &vec![current[0].id, current[1].id]);
            }
            other => panic!("unexpected violation {other:?}"),
        }
    }

    #[test]
    fn reports_coverage_problems() {
        let current = vec![photo(1, true), photo(2, false), photo(3, false)];
        let stranger = photo(1, false);
        let updates = vec![
            update(&current[0], 1, true),
            update(&current[0], 2, false),
            update(&stranger, 3, false),
        ];

        let violations = validate_sync(&current, &updates, 255).unwrap_err();
        assert_eq!(
            rules(&violations),
            vec![
                "unique_photo_ids",
                "photo_belongs_to_product",
                "full_coverage",
                "full_coverage",
            ]
        );
        assert_eq!(violations[1].field(), format!("photos[{}].id", stranger.id));
    }

    #[test]
    fn rejects_non_positive_positions_and_long_descriptions() {
        let current = vec![photo(1, true)];
        let mut only = update(&current[0], 0, true);
        only.description = Some("x".repeat(11));

        let violations = validate_sync(&current, &only_list(only), 10).unwrap_err();
        assert_eq!(rules(&violations), vec!["positive_position", "description_length"]);
    }

    #[rstest]
    #[case(MAX_POSITION, true)]
    #[case(MAX_POSITION + 1, false)]
    #[case(i32::MAX, false)]
    fn caps_positions(#[case] position: i32, #[case] accepted: bool) {
        let current = vec![photo(1, true)];
        let result = validate_sync(&current, &only_list(update(&current[0], position, true)), 255);

        if accepted {
            assert!(result.is_ok());
        } else {
            let violations = result.unwrap_err();
            assert_eq!(rules(&violations), vec!["position_limit"]);
            assert_eq!(
                violations[0].field(),
                format!("photos[{}].position", current[0].id)
            );
        }
    }

    #[test]
    fn description_limit_counts_trimmed_characters() {
        let current = vec![photo(1, true)];
        let mut only = update(&current[0], 1, true);
        only.description = Some(format!("  {}  ", "é".repeat(10)));
        assert!(validate_sync(&current, &only_list(only), 10).is_ok());
    }

    #[test]
    fn empty_submission_for_non_empty_gallery_is_rejected() {
        let current = vec![photo(1, true)];
        let violations = validate_sync(&current, &[], 255).unwrap_err();
        assert_eq!(rules(&violations), vec!["full_coverage", "exactly_one_primary"]);
    }

    fn only_list(update: PhotoUpdate) -> Vec<PhotoUpdate> {
        vec![update]
    }
}
