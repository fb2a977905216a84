//! Query canonicalization for the photo API request.

use url::Url;

/// Canonical name of the size parameter.
pub const SIZE_PARAM: &str = "image_size[]";

/// True for `image_size` and any bracketed form (`image_size[]`, `image_size[0]`).
pub fn is_size_param(name: &str) -> bool {
    name == "image_size"
        || (name.starts_with("image_size[") && name.ends_with(']'))
}

/// Parameters forced onto the API request besides the size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOverrides {
    /// Photo stream (`feature=`), e.g. `popular` or `fresh_today`.
    pub feature: Option<String>,
    /// Category filter (`only=`).
    pub category: Option<String>,
}

impl QueryOverrides {
    fn forced(&self) -> Vec<(&'static str, &str)> {
        let mut forced = Vec::new();
        if let Some(feature) = &self.feature {
            forced.push(("feature", feature.as_str()));
        }
        if let Some(category) = &self.category {
            forced.push(("only", category.as_str()));
        }
        forced
    }
}

/// Replaces every size parameter with a single `image_size[]=<size>`, placed
/// where the first size parameter was (appended when there was none).
/// Each override (`feature`, `only`) is replaced or added the same way.
/// Other parameters keep their order and values.
pub fn canonicalize_query(url: &Url, image_size: u32, overrides: &QueryOverrides) -> Url {
    let size = image_size.to_string();
    let forced = overrides.forced();
    let mut written = vec![false; forced.len()];
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut size_written = false;

    for (name, value) in url.query_pairs() {
        if is_size_param(&name) {
            if value != size.as_str() {
                tracing::trace!(param = %name, value = %value, "dropping stale size parameter");
            }
            if !size_written {
                pairs.push((SIZE_PARAM.to_string(), size.clone()));
                size_written = true;
            }
            continue;
        }
        if let Some(i) = forced.iter().position(|(forced_name, _)| name == *forced_name) {
            if !written[i] {
                pairs.push((forced[i].0.to_string(), forced[i].1.to_string()));
                written[i] = true;
            }
            continue;
        }
        pairs.push((name.into_owned(), value.into_owned()));
    }

    if !size_written {
        pairs.push((SIZE_PARAM.to_string(), size));
    }
    for ((name, value), done) in forced.iter().zip(written) {
        if !done {
            pairs.push((name.to_string(), value.to_string()));
        }
    }

    let mut rewritten = url.clone();
    rewritten.query_pairs_mut().clear().extend_pairs(pairs);
    rewritten
}
