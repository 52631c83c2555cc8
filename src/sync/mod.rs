//! The synchronisation loop.
//!
//! For each input row: extract the country fields, skip rows without an M49
//! code, optionally confirm the country group exists, build the record, and
//! upsert it. Every per-row failure is reported and the loop moves on; only
//! I/O errors reading the row source itself end the run.

mod report;

pub use report::{RowOutcome, SyncReport};

use std::io::Write;

use crate::catalog::{upsert, CatalogClient};
use crate::error::SyncError;
use crate::hxl::HxlRow;
use crate::record::{build_record, BuildOutcome, BuildSettings, CountryRow, LabelStyle, RowTags};

/// Options for the synchronisation loop.
#[derive(Clone, Debug, Default)]
pub struct SyncOptions {
    pub tags: RowTags,
    pub build: BuildSettings,
    pub label_style: LabelStyle,
    /// Confirm the country group exists before upserting.
    pub check_groups: bool,
}

/// Drives rows through the builder into a catalog.
pub struct Synchronizer<C: CatalogClient> {
    client: C,
    options: SyncOptions,
}

impl<C: CatalogClient> Synchronizer<C> {
    pub fn new(client: C, options: SyncOptions) -> Self {
        Self { client, options }
    }

    /// Process every row, writing one status line per outcome to `out`.
    ///
    /// # Errors
    /// Only I/O failures reading the rows or writing to `out` are returned.
    /// Rows that cannot be decoded and catalog errors are recorded in the
    /// report.
    pub fn run<I, W>(&self, rows: I, out: &mut W) -> Result<SyncReport, SyncError>
    where
        I: IntoIterator<Item = Result<HxlRow, SyncError>>,
        W: Write,
    {
        let mut report = SyncReport::new();

        for row in rows {
            let outcome = match row {
                Ok(row) => self.sync_row(&row),
                Err(err) if err.is_row_local() => RowOutcome::Unreadable {
                    error: err.to_string(),
                },
                Err(err) => return Err(err),
            };
            match &outcome {
                RowOutcome::Skipped { .. } => log::debug!("{}", outcome),
                other => writeln!(out, "{}", other)?,
            }
            report.add(outcome);
        }

        Ok(report)
    }

    /// Synchronise a single row.
    pub fn sync_row(&self, row: &HxlRow) -> RowOutcome {
        let country = CountryRow::from_hxl(row, &self.options.tags);

        let Some(code) = country.m49_code.as_deref().map(str::to_lowercase) else {
            return RowOutcome::Skipped {
                row_number: row.row_number,
            };
        };
        let country_name = country.country_name.clone().unwrap_or_default();

        if self.options.check_groups && !self.group_exists(&code) {
            return RowOutcome::GroupNotFound {
                code,
                country: country_name,
            };
        }

        let record = match build_record(&country, &self.options.build) {
            Ok(BuildOutcome::Record(record)) => record,
            Ok(BuildOutcome::Skip) => {
                return RowOutcome::Skipped {
                    row_number: row.row_number,
                }
            }
            Err(err) => {
                return RowOutcome::Failed {
                    identifier: crate::record::dataset_identifier(&code),
                    error: err.to_string(),
                }
            }
        };

        let identifier = record.identifier().to_string();
        let result = record
            .to_payload(self.options.label_style)
            .and_then(|payload| upsert(&self.client, &identifier, payload));

        match result {
            Ok(action) => RowOutcome::Synced { identifier, action },
            Err(err) => RowOutcome::Failed {
                identifier,
                error: err.to_string(),
            },
        }
    }

    fn group_exists(&self, code: &str) -> bool {
        match self.client.group_exists(code) {
            Ok(exists) => exists,
            Err(err) => {
                log::warn!("Group lookup for '{}' failed: {}", code, err);
                false
            }
        }
    }
}
