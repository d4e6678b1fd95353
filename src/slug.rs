use crate::validation::ValidationError;

/// Turns a display name into a URL slug.
///
/// Lowercases, keeps ASCII letters, digits and `_`, folds runs of whitespace
/// and hyphens into one `-`, and trims `-`/`_` from both ends. Any other
/// character is dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut separator = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if separator && !slug.is_empty() {
                slug.push('-');
            }
            separator = false;
            slug.push(ch);
        } else if ch == '-' || ch.is_whitespace() {
            separator = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Slugifies `name` and appends `-1` until `taken` no longer matches.
///
/// Repeated collisions stack the suffix: `shoes`, `shoes-1`, `shoes-1-1`.
pub fn unique_slug(
    name: &str,
    mut taken: impl FnMut(&str) -> bool,
) -> Result<String, ValidationError> {
    let mut slug = slugify(name);
    if slug.is_empty() {
        return Err(ValidationError::EmptySlug(name.to_string()));
    }
    while taken(&slug) {
        slug.push_str("-1");
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn slugify_normalizes_names() {
        assert_eq!(slugify("Shoes"), "shoes");
        assert_eq!(slugify("  Running   Shoes  "), "running-shoes");
        assert_eq!(slugify("Men's T-Shirts & Tops"), "mens-t-shirts-tops");
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("_hidden_"), "hidden");
        assert_eq!(slugify("Café"), "caf");
    }

    #[test]
    fn unique_slug_appends_literal_suffix() {
        let mut taken: HashSet<String> = HashSet::new();
        assert_eq!(unique_slug("Shoes", |s| taken.contains(s)).unwrap(), "shoes");

        taken.insert("shoes".into());
        assert_eq!(unique_slug("Shoes", |s| taken.contains(s)).unwrap(), "shoes-1");

        taken.insert("shoes-1".into());
        assert_eq!(
            unique_slug("Shoes", |s| taken.contains(s)).unwrap(),
            "shoes-1-1"
        );
    }

    #[test]
    fn name_without_slug_characters_is_rejected() {
        assert_eq!(
            unique_slug("!!!", |_| false),
            Err(ValidationError::EmptySlug("!!!".into()))
        );
    }
}
