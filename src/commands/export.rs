//! Export command implementation

use crate::admin::{export_conversions, CsvExport, ExportParams};
use crate::config::Config;
use crate::error::Result;
use crate::leads::LeadStore;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub conversion_name: Option<String>,
    pub currency: Option<String>,
    pub exclude_synced: bool,
    pub only_converted: bool,
    /// Target file; a directory receives the generated file name
    pub output: Option<PathBuf>,
}

impl ExportOptions {
    fn params(&self) -> ExportParams {
        let flag = |set: bool| set.then(|| "true".to_string());
        ExportParams {
            status: self.status.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            conversion_name: self.conversion_name.clone(),
            currency: self.currency.clone(),
            exclude_synced: flag(self.exclude_synced),
            only_converted: flag(self.only_converted),
        }
    }
}

fn resolve_output(output: &Path, export: &CsvExport) -> PathBuf {
    if output.is_dir() {
        output.join(&export.filename)
    } else {
        output.to_path_buf()
    }
}

/// Render the conversion CSV and write it to a file or stdout.
///
/// Returns the path written, or `None` for stdout.
pub async fn cmd_export(
    config: &Config,
    store: &LeadStore,
    options: &ExportOptions,
) -> Result<(CsvExport, Option<PathBuf>)> {
    let export = export_conversions(
        store,
        &options.params(),
        &config.leads.conversion_name,
        &config.google_ads.currency,
    )
    .await?;

    let Some(output) = &options.output else {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", export.body)?;
        return Ok((export, None));
    };

    let path = resolve_output(output, &export);
    std::fs::write(&path, format!("{}\n", export.body))?;
    info!(rows = export.rows, path = %path.display(), "Wrote conversion export");
    Ok((export, Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::{AttributionData, RequestContext};
    use crate::leads::NewLead;
    use crate::validation::LeadFormData;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_export_to_directory_uses_generated_name() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(temp_dir.path().to_path_buf()));
        let store = LeadStore::open(&config).await.unwrap();

        store
            .insert(NewLead::new(
                LeadFormData {
                    name: "Jo Li".into(),
                    practice_name: "Li Clinic".into(),
                    email: "jo@x.com".into(),
                    phone: "5551234567".into(),
                    website: None,
                    project_type: None,
                },
                AttributionData {
                    gclid: Some("abc123".into()),
                    ..Default::default()
                },
                RequestContext::default(),
            ))
            .await
            .unwrap();

        let options = ExportOptions {
            output: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let (export, path) = cmd_export(&config, &store, &options).await.unwrap();
        let path = path.unwrap();

        assert_eq!(export.rows, 1);
        assert_eq!(path, temp_dir.path().join(&export.filename));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("Google Click ID,"));
        assert!(written.contains("abc123,Lead Submission,"));
    }
}
