//! First-run bootstrap: data directories, `.env` template and a sample document.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

const ENV_TEMPLATE: &str = "# API keys (leave empty to run with mock data)
OPENAI_API_KEY=
OPENWEATHER_API_KEY=

# Project name reported by /api/status
LANGCHAIN_PROJECT=weather-rag-agent

# Force mock mode even when keys are present
# PAPERWEATHER_OFFLINE=1
# OPENAI_ERROR=insufficient_quota
";

const SAMPLE_DOCUMENT_NAME: &str = "sample_document.txt";

const SAMPLE_DOCUMENT: &str = "# PaperWeather sample document

This file lets you try document questions before uploading anything yourself.

## What PaperWeather does
- Indexes PDFs and text files from the data directory
- Answers questions about their content
- Looks up the current weather for a city

## Adding documents
Upload PDFs or paste text in the web UI, or drop .pdf files into data/pdfs and
.txt files into data/documents, then run `paperweather ingest`.
";

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupReport {
    pub directories: Vec<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub sample_document: Option<PathBuf>,
}

pub fn run_setup(paths: &AppPaths) -> Result<SetupReport, ApiError> {
    paths.ensure_directories()?;

    let mut report = SetupReport {
        directories: paths
            .data_directories()
            .iter()
            .map(|p| p.to_path_buf())
            .collect(),
        ..SetupReport::default()
    };

    let env_path = paths.env_file();
    if env_path.exists() {
        tracing::info!(".env file already exists at {}", env_path.display());
    } else {
        fs::write(&env_path, ENV_TEMPLATE)?;
        tracing::info!("Created {}; add your API keys there", env_path.display());
        report.env_file = Some(env_path);
    }

    if has_documents(&paths.documents_dir)? {
        tracing::info!("Documents already present in {}", paths.documents_dir.display());
    } else {
        let sample = paths.documents_dir.join(SAMPLE_DOCUMENT_NAME);
        fs::write(&sample, SAMPLE_DOCUMENT)?;
        tracing::info!("Created sample document {}", sample.display());
        report.sample_document = Some(sample);
    }

    Ok(report)
}

fn has_documents(dir: &Path) -> Result<bool, ApiError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}
