//! Unique resource names

use uuid::Uuid;

/// Longest description prefix kept in a generated name
const MAX_DESCRIPTION_LEN: usize = 23;

/// Name of the form `{kind}-{description}-{32 hex chars}`
///
/// The description is cut to 23 characters so the result stays under the
/// 63 character label limit for short kinds such as `pod` or `secret`.
pub fn create_unique_resource_name(description: &str, kind: &str) -> String {
    let description: String = description.chars().take(MAX_DESCRIPTION_LEN).collect();
    format!("{}-{}-{}", kind, description, Uuid::new_v4().simple())
}
