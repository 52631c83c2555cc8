use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use crate::error::SyncError;

use super::HxlReader;

/// Where the input spreadsheet lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputLocation {
    Url(String),
    Path(PathBuf),
}

impl InputLocation {
    /// Classify a user-supplied input string.
    ///
    /// `http(s)` URLs are fetched remotely; anything else is a local path.
    /// Google Sheets editor links are rewritten to their CSV export URL.
    pub fn parse(input: &str) -> Result<Self, SyncError> {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Ok(Self::Url(normalize_remote_url(trimmed)?))
        } else {
            Ok(Self::Path(PathBuf::from(trimmed)))
        }
    }

    /// Human-readable name for diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

/// Rewrite well-known spreadsheet editor URLs to a CSV download.
fn normalize_remote_url(input: &str) -> Result<String, SyncError> {
    let url = url::Url::parse(input).map_err(|source| SyncError::RowSourceFetch {
        url: input.to_string(),
        message: format!("invalid URL: {source}"),
    })?;

    if url.host_str() != Some("docs.google.com") {
        return Ok(url.into());
    }

    let segments: Vec<String> = url
        .path_segments()
        .map(|iter| {
            iter.filter(|seg| !seg.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let key = match segments.as_slice() {
        [spreadsheets, d, key, ..] if spreadsheets == "spreadsheets" && d == "d" => key,
        _ => return Ok(url.into()),
    };

    // The sheet id can be in the fragment (#gid=N) or the query (?gid=N).
    let gid = url
        .fragment()
        .and_then(|fragment| fragment.strip_prefix("gid="))
        .map(str::to_string)
        .or_else(|| {
            url.query_pairs()
                .find(|(name, _)| name == "gid")
                .map(|(_, value)| value.into_owned())
        });

    let mut export = format!("https://docs.google.com/spreadsheets/d/{key}/export?format=csv");
    if let Some(gid) = gid {
        export.push_str("&gid=");
        export.push_str(&urlencoding::encode(&gid));
    }
    Ok(export)
}

/// Open the input and position a reader after its hashtag row.
///
/// Remote inputs are always fetched fresh; there is no local cache.
pub fn open(
    location: &InputLocation,
    agent: &ureq::Agent,
    user_agent: Option<&str>,
) -> Result<HxlReader<Box<dyn Read>>, SyncError> {
    let name = location.display_name();
    let reader: Box<dyn Read> = match location {
        InputLocation::Path(path) => {
            let file = File::open(path).map_err(|source| SyncError::InputRead {
                path: path.clone(),
                source,
            })?;
            Box::new(BufReader::new(file))
        }
        InputLocation::Url(url) => {
            let mut request = agent.get(url.as_str());
            if let Some(user_agent) = user_agent {
                request = request.header("User-Agent", user_agent);
            }
            let response = request.call().map_err(|source| SyncError::RowSourceFetch {
                url: url.clone(),
                message: source.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(SyncError::RowSourceFetch {
                    url: url.clone(),
                    message: format!("HTTP {}", status.as_u16()),
                });
            }
            Box::new(response.into_body().into_reader())
        }
    };

    log::info!("Reading rows from {}", name);
    HxlReader::new(reader, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_edit_url_becomes_csv_export() {
        let location = InputLocation::parse(
            "https://docs.google.com/spreadsheets/d/1TfDOvNysztJCMLc0/edit#gid=0",
        )
        .expect("parse");
        assert_eq!(
            location,
            InputLocation::Url(
                "https://docs.google.com/spreadsheets/d/1TfDOvNysztJCMLc0/export?format=csv&gid=0"
                    .to_string()
            )
        );
    }

    #[test]
    fn google_url_without_gid_exports_first_sheet() {
        let location =
            InputLocation::parse("https://docs.google.com/spreadsheets/d/abc123/edit").expect("parse");
        assert_eq!(
            location,
            InputLocation::Url(
                "https://docs.google.com/spreadsheets/d/abc123/export?format=csv".to_string()
            )
        );
    }

    #[test]
    fn other_urls_pass_through() {
        let location = InputLocation::parse("https://example.org/data.csv").expect("parse");
        assert_eq!(
            location,
            InputLocation::Url("https://example.org/data.csv".to_string())
        );
    }

    #[test]
    fn plain_strings_are_paths() {
        let location = InputLocation::parse("tests/fixtures/countries.csv").expect("parse");
        assert_eq!(
            location,
            InputLocation::Path(PathBuf::from("tests/fixtures/countries.csv"))
        );
    }

    #[test]
    fn malformed_url_is_rejected() {
        let err = InputLocation::parse("https://").expect_err("should fail");
        assert!(matches!(err, SyncError::RowSourceFetch { .. }));
    }

    #[test]
    fn open_reads_local_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "#country+code+m49\nKEN\n").expect("write");

        let agent = crate::net::agent(std::time::Duration::from_secs(1));
        let rows: Vec<_> = open(&InputLocation::Path(path), &agent, None)
            .expect("open")
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn open_missing_file_names_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.csv");
        let agent = crate::net::agent(std::time::Duration::from_secs(1));

        let err = match open(&InputLocation::Path(path.clone()), &agent, None) {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        };
        assert!(matches!(err, SyncError::InputRead { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }
}
