//! Resource URL construction.
//!
//! Templates use `{name}` placeholders. Every value is percent-encoded before
//! interpolation, so codes containing reserved characters (`&`, `/`, `#`)
//! cannot break the resulting URL. The filled template must parse as an
//! absolute URL.

use std::collections::BTreeMap;

use crate::error::SyncError;

use super::ResourceFormat;

/// Default download endpoint on the NGO Aid Map site.
pub const DEFAULT_DOWNLOAD_TEMPLATE: &str = "http://ngoaidmap.org/downloads?doc={format}&geolocation={code}&level=0&name={filename}&status=active";

/// Default HXL proxy endpoint used for re-tagging.
pub const DEFAULT_PROXY_TEMPLATE: &str =
    "https://proxy.hxlstandard.org/data.{format}?url={url}&stub={stub}";

/// Fill `{key}` placeholders with percent-encoded values and validate the result.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> Result<String, SyncError> {
    let mut filled = template.to_string();
    for (key, value) in values {
        filled = filled.replace(&format!("{{{key}}}"), &urlencoding::encode(value));
    }

    if let Some(start) = filled.find('{') {
        let end = filled[start..]
            .find('}')
            .map(|offset| start + offset + 1)
            .unwrap_or(filled.len());
        return Err(SyncError::UrlTemplate {
            template: template.to_string(),
            message: format!("unknown placeholder '{}'", &filled[start..end]),
        });
    }

    let url = url::Url::parse(&filled).map_err(|source| SyncError::UrlTemplate {
        template: template.to_string(),
        message: source.to_string(),
    })?;
    Ok(url.into())
}

/// Direct download URL for one format of a country's activity list.
pub fn download_url(
    template: &str,
    format: ResourceFormat,
    interaction_code: &str,
    filename_stem: &str,
) -> Result<String, SyncError> {
    let filename = format!("{}.{}", filename_stem, format.as_str());
    fill_template(
        template,
        &[
            ("format", format.as_str()),
            ("code", interaction_code),
            ("filename", &filename),
        ],
    )
}

/// Wrap `inner_url` in the HXL proxy, applying column-retagging directives.
///
/// The directives become extra query parameters (`tagger-01-header=...`,
/// `filter01=cut`, ...). Keeping this separate from record building lets the
/// proxy be swapped or dropped without touching the builder.
pub fn proxy_url(
    template: &str,
    inner_url: &str,
    format: ResourceFormat,
    stub: &str,
    directives: &BTreeMap<String, String>,
) -> Result<String, SyncError> {
    let outer = fill_template(
        template,
        &[
            ("format", format.as_str()),
            ("url", inner_url),
            ("stub", stub),
        ],
    )?;

    if directives.is_empty() {
        return Ok(outer);
    }

    let mut url = url::Url::parse(&outer).map_err(|source| SyncError::UrlTemplate {
        template: template.to_string(),
        message: source.to_string(),
    })?;
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in directives {
            query.append_pair(name, value);
        }
    }
    Ok(url.into())
}
