//! Row-to-record mapping.
//!
//! [`build_record`] is pure: it performs no I/O and depends only on the row
//! and the settings, so two runs over the same input produce identical
//! records.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::SyncError;

use super::urls::{self, DEFAULT_DOWNLOAD_TEMPLATE};
use super::{dataset_identifier, CountryRow, DatasetRecord, Resource, ResourceFormat};

/// Tags carried by every dataset.
const BASE_TAGS: [&str; 2] = ["3w", "ngo"];

/// Data-format marker added when resources go through the HXL proxy.
const HXL_TAG: &str = "hxl";

/// Fixed descriptive fields that do not depend on the row.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatasetDefaults {
    pub dataset_source: String,
    pub owner_org: String,
    pub private: bool,
    pub maintainer: String,
    pub package_creator: String,
    pub license_id: String,
    pub methodology: String,
    pub data_update_frequency: String,
    pub dataset_date: String,
}

impl Default for DatasetDefaults {
    fn default() -> Self {
        Self {
            dataset_source: "InterAction NGO Aid Map".to_string(),
            owner_org: "interaction".to_string(),
            private: false,
            maintainer: "eyox".to_string(),
            package_creator: "script".to_string(),
            license_id: "Public Domain".to_string(),
            methodology: "Survey".to_string(),
            data_update_frequency: "0".to_string(),
            dataset_date: "11/16/2015-12/31/2027".to_string(),
        }
    }
}

/// HXL proxy rewrite applied to each resource URL.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ProxySettings {
    pub template: String,
    #[serde(default)]
    pub directives: BTreeMap<String, String>,
}

/// Everything the builder needs besides the row itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildSettings {
    pub formats: Vec<ResourceFormat>,
    pub download_url_template: String,
    pub filename_stem: String,
    pub proxy: Option<ProxySettings>,
    pub dataset: DatasetDefaults,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            formats: vec![ResourceFormat::Csv, ResourceFormat::Json],
            download_url_template: DEFAULT_DOWNLOAD_TEMPLATE.to_string(),
            filename_stem: "activities".to_string(),
            proxy: None,
            dataset: DatasetDefaults::default(),
        }
    }
}

/// Result of mapping one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The row has no M49 code and is not synchronised.
    Skip,
    Record(DatasetRecord),
}

/// Map one country row to a dataset record.
///
/// Only a missing M49 code causes a skip; a missing country name or
/// interaction code is interpolated as an empty string.
///
/// # Errors
/// Returns an error if a configured URL template cannot produce a valid URL.
pub fn build_record(row: &CountryRow, settings: &BuildSettings) -> Result<BuildOutcome, SyncError> {
    let Some(m49_code) = row.m49_code.as_deref().filter(|c| !c.is_empty()) else {
        return Ok(BuildOutcome::Skip);
    };

    let code = m49_code.to_lowercase();
    let identifier = dataset_identifier(m49_code);
    let country = row.country_name.as_deref().unwrap_or_default();
    let interaction_code = row.interaction_code.as_deref().unwrap_or_default();
    let defaults = &settings.dataset;

    let mut tags: Vec<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();
    tags.push(code.clone());
    if settings.proxy.is_some() {
        tags.push(HXL_TAG.to_string());
    }

    let resources = settings
        .formats
        .iter()
        .map(|&format| -> Result<Resource, SyncError> {
            Ok(Resource {
                name: format!("List of activities in {country}"),
                description: format!(
                    "Spreadsheet listing InterAction member activities in {country}. \
                     Unverified member-uploaded data. \
                     Note that this data comes live from the web site, and can change at any time."
                ),
                url: resource_url(format, interaction_code, &identifier, settings)?,
                format,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BuildOutcome::Record(DatasetRecord {
        title: format!("InterAction member activities in {country}"),
        notes: format!(
            "List of aid activities by InterAction members in {country}. \
             Source: http://ngoaidmap.org/location/{}",
            urlencoding::encode(interaction_code)
        ),
        dataset_source: defaults.dataset_source.clone(),
        owner_org: defaults.owner_org.clone(),
        private: defaults.private,
        maintainer: defaults.maintainer.clone(),
        package_creator: defaults.package_creator.clone(),
        license_id: defaults.license_id.clone(),
        methodology: defaults.methodology.clone(),
        data_update_frequency: defaults.data_update_frequency.clone(),
        dataset_date: defaults.dataset_date.clone(),
        caveats: "Unverified live data. May change at any time. \
                  For information on data limitations, visit http://ngoaidmap.org/p/data"
            .to_string(),
        groups: vec![code],
        tags,
        resources,
        name: identifier,
    }))
}

fn resource_url(
    format: ResourceFormat,
    interaction_code: &str,
    identifier: &str,
    settings: &BuildSettings,
) -> Result<String, SyncError> {
    match &settings.proxy {
        None => urls::download_url(
            &settings.download_url_template,
            format,
            interaction_code,
            &settings.filename_stem,
        ),
        Some(proxy) => {
            // The proxy always pulls the CSV export and re-serialises it.
            let inner = urls::download_url(
                &settings.download_url_template,
                ResourceFormat::Csv,
                interaction_code,
                &settings.filename_stem,
            )?;
            urls::proxy_url(&proxy.template, &inner, format, identifier, &proxy.directives)
        }
    }
}
