//! On-disk dataset registry.
//!
//! Scans a root directory laid out as
//! `root/<dataset>/<variant>/<version>/*.parquet` and resolves a
//! (dataset, variant, version) triple to a concrete file. The registry is
//! an explicitly owned value with an explicit [`DatasetRegistry::refresh`]
//! operation, so tests and callers construct isolated instances instead of
//! sharing process-wide state. Schema and row counts come from Parquet
//! metadata only; no row data is read during a scan.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{
    dataset::TableScan,
    error::{Error, Result},
};

/// One column of a registered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Arrow data type, rendered.
    pub dtype: String,
    /// Whether the column admits nulls.
    pub nullable: bool,
}

/// The Parquet file backing one dataset version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFile {
    /// Absolute path.
    pub path: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Last modification, unix epoch seconds.
    pub modified_at: u64,
}

/// One version of a dataset variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetVersion {
    /// Version directory name.
    pub version: String,
    /// Version directory path.
    pub path: PathBuf,
    /// The backing file.
    pub file: DatasetFile,
    /// Column schema from Parquet metadata.
    pub columns: Vec<ColumnInfo>,
    /// Row count from Parquet metadata.
    pub row_count: u64,
}

/// One variant of a dataset, versions sorted descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetVariant {
    /// Variant directory name.
    pub variant: String,
    /// Versions, newest name first.
    pub versions: Vec<DatasetVersion>,
}

/// One registered dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Dataset slug (top-level directory name).
    pub slug: String,
    /// Dataset directory path.
    pub path: PathBuf,
    /// Variants, sorted by name.
    pub variants: Vec<DatasetVariant>,
}

impl DatasetEntry {
    /// Finds a variant by name.
    pub fn variant(&self, name: &str) -> Option<&DatasetVariant> {
        self.variants.iter().find(|v| v.variant == name)
    }
}

/// Injectable registry over a dataset root directory.
///
/// # Example
///
/// ```no_run
/// use calidad::registry::DatasetRegistry;
///
/// let registry = DatasetRegistry::open("data/datasets").unwrap();
/// let version = registry.resolve("webcrawl", "clean", "v2").unwrap();
/// println!("{} rows at {:?}", version.row_count, version.file.path);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    root: PathBuf,
    datasets: Vec<DatasetEntry>,
}

impl DatasetRegistry {
    /// Creates an empty registry over `root` without scanning.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            datasets: Vec::new(),
        }
    }

    /// Creates a registry and performs the initial scan.
    ///
    /// # Errors
    ///
    /// Returns an error if a discovered Parquet file cannot be read.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let mut registry = Self::new(root);
        registry.refresh()?;
        Ok(registry)
    }

    /// Returns the registry root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-scans the root directory, replacing the in-memory view.
    ///
    /// A missing root yields an empty registry, not an error; version
    /// directories without a Parquet file are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a discovered Parquet file cannot be opened or
    /// has an unreadable footer.
    pub fn refresh(&mut self) -> Result<()> {
        if !self.root.exists() {
            self.datasets = Vec::new();
            return Ok(());
        }

        // slug -> variant -> version -> parquet files
        let mut tree: BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<PathBuf>>>> =
            BTreeMap::new();

        for entry in WalkDir::new(&self.root)
            .min_depth(4)
            .max_depth(4)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if let [slug, variant, version, _file] = parts.as_slice() {
                tree.entry(slug.clone())
                    .or_default()
                    .entry(variant.clone())
                    .or_default()
                    .entry(version.clone())
                    .or_default()
                    .push(path.to_path_buf());
            }
        }

        let mut datasets = Vec::new();
        for (slug, variants) in tree {
            let dataset_path = self.root.join(&slug);
            let mut entries = Vec::new();
            for (variant, versions) in variants {
                let mut version_entries = Vec::new();
                for (version, mut files) in versions {
                    files.sort();
                    let Some(file) = files.first() else { continue };
                    version_entries.push(read_version(&version, file)?);
                }
                if version_entries.is_empty() {
                    continue;
                }
                // Newest version name first.
                version_entries.sort_by(|a, b| b.version.cmp(&a.version));
                entries.push(DatasetVariant {
                    variant,
                    versions: version_entries,
                });
            }
            if entries.is_empty() {
                continue;
            }
            datasets.push(DatasetEntry {
                slug,
                path: dataset_path,
                variants: entries,
            });
        }

        info!(root = %self.root.display(), datasets = datasets.len(), "registry scan");
        self.datasets = datasets;
        Ok(())
    }

    /// Returns every registered dataset.
    pub fn datasets(&self) -> &[DatasetEntry] {
        &self.datasets
    }

    /// Finds a dataset by slug.
    pub fn find(&self, slug: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.slug == slug)
    }

    /// Resolves a (dataset, variant, version) triple.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` naming the first level that failed to resolve.
    pub fn resolve(&self, slug: &str, variant: &str, version: &str) -> Result<&DatasetVersion> {
        let dataset = self
            .find(slug)
            .ok_or_else(|| Error::not_found(format!("dataset '{slug}'")))?;
        let variant_entry = dataset.variant(variant).ok_or_else(|| {
            Error::not_found(format!("variant '{variant}' of dataset '{slug}'"))
        })?;
        variant_entry
            .versions
            .iter()
            .find(|v| v.version == version)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "version '{version}' of dataset '{slug}/{variant}'"
                ))
            })
    }

    /// Resolves a triple and opens a lazy scan over its file.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the triple does not resolve or the file has
    /// disappeared since the last refresh.
    pub fn open_scan(&self, slug: &str, variant: &str, version: &str) -> Result<TableScan> {
        let entry = self.resolve(slug, variant, version)?;
        if !entry.file.path.exists() {
            return Err(Error::not_found(format!(
                "file {:?} for '{slug}/{variant}/{version}' no longer exists",
                entry.file.path
            )));
        }
        Ok(TableScan::from_parquet(&entry.file.path)?
            .with_label(format!("{slug}/{variant}/{version}")))
    }
}

fn read_version(version: &str, file: &Path) -> Result<DatasetVersion> {
    let handle = std::fs::File::open(file).map_err(|e| Error::io(e, file))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(handle)?;

    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|f| ColumnInfo {
            name: f.name().clone(),
            dtype: f.data_type().to_string(),
            nullable: f.is_nullable(),
        })
        .collect();
    let row_count = u64::try_from(builder.metadata().file_metadata().num_rows())
        .unwrap_or_default();

    let meta = std::fs::metadata(file).map_err(|e| Error::io(e, file))?;
    let modified_at = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());

    debug!(version, rows = row_count, path = %file.display(), "registered version");
    Ok(DatasetVersion {
        version: version.to_string(),
        path: file.parent().map(Path::to_path_buf).unwrap_or_default(),
        file: DatasetFile {
            path: file.to_path_buf(),
            size_bytes: meta.len(),
            modified_at,
        },
        columns,
        row_count,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Int64Array, RecordBatch, StringArray},
        datatypes::{DataType, Field, Schema},
    };
    use parquet::arrow::ArrowWriter;

    use super::*;

    fn write_parquet(path: &Path, rows: usize) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let schema = Arc::new(Schema::new(vec![
            Field::new("text", DataType::Utf8, true),
            Field::new("token_count", DataType::Int64, true),
        ]));
        let texts: Vec<Option<String>> =
            (0..rows).map(|i| Some(format!("row number {i}"))).collect();
        let tokens: Vec<Option<i64>> = (0..rows).map(|i| Some(i as i64 + 3)).collect();
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(StringArray::from(texts)),
                Arc::new(Int64Array::from(tokens)),
            ],
        )
        .expect("batch");

        let file = std::fs::File::create(path).expect("create");
        let mut writer = ArrowWriter::try_new(file, schema, None).expect("writer");
        writer.write(&batch).expect("write");
        writer.close().expect("close");
    }

    fn build_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write_parquet(&root.join("wiki/original/v1/wiki.parquet"), 10);
        write_parquet(&root.join("wiki/original/v2/wiki.parquet"), 20);
        write_parquet(&root.join("wiki/clean/v1/wiki.parquet"), 8);
        write_parquet(&root.join("news/original/v1/news.parquet"), 5);
        // A version directory without a parquet file is skipped.
        std::fs::create_dir_all(root.join("wiki/original/v3")).expect("mkdir");
        dir
    }

    #[test]
    fn test_scan_discovers_layout() {
        let dir = build_root();
        let registry = DatasetRegistry::open(dir.path()).expect("registry");

        assert_eq!(registry.datasets().len(), 2);
        let wiki = registry.find("wiki").expect("wiki");
        assert_eq!(wiki.variants.len(), 2);
        let original = wiki.variant("original").expect("variant");
        assert_eq!(original.versions.len(), 2);
        // Newest version name first; the empty v3 directory is absent.
        assert_eq!(original.versions[0].version, "v2");
        assert_eq!(original.versions[1].version, "v1");
    }

    #[test]
    fn test_version_metadata() {
        let dir = build_root();
        let registry = DatasetRegistry::open(dir.path()).expect("registry");

        let version = registry.resolve("wiki", "original", "v2").expect("resolve");
        assert_eq!(version.row_count, 20);
        assert_eq!(version.columns.len(), 2);
        assert_eq!(version.columns[0].name, "text");
        assert!(version.file.size_bytes > 0);
        assert!(version.file.path.ends_with("wiki/original/v2/wiki.parquet"));
    }

    #[test]
    fn test_resolve_failures_name_the_level() {
        let dir = build_root();
        let registry = DatasetRegistry::open(dir.path()).expect("registry");

        let err = registry.resolve("nope", "original", "v1").err().expect("err");
        assert!(err.to_string().contains("dataset 'nope'"));

        let err = registry.resolve("wiki", "nope", "v1").err().expect("err");
        assert!(err.to_string().contains("variant 'nope'"));

        let err = registry.resolve("wiki", "original", "v9").err().expect("err");
        assert!(err.to_string().contains("version 'v9'"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let registry =
            DatasetRegistry::open("/definitely/not/a/real/root").expect("registry");
        assert!(registry.datasets().is_empty());
    }

    #[test]
    fn test_refresh_picks_up_new_versions() {
        let dir = build_root();
        let mut registry = DatasetRegistry::open(dir.path()).expect("registry");
        assert!(registry.resolve("news", "original", "v2").is_err());

        write_parquet(&dir.path().join("news/original/v2/news.parquet"), 7);
        registry.refresh().expect("refresh");
        let version = registry.resolve("news", "original", "v2").expect("resolve");
        assert_eq!(version.row_count, 7);
    }

    #[test]
    fn test_open_scan_labels_the_triple() {
        let dir = build_root();
        let registry = DatasetRegistry::open(dir.path()).expect("registry");

        let scan = registry.open_scan("wiki", "clean", "v1").expect("scan");
        assert_eq!(scan.row_count(), 8);
        assert_eq!(scan.label(), "wiki/clean/v1");
    }

    #[test]
    fn test_entries_serialize() {
        let dir = build_root();
        let registry = DatasetRegistry::open(dir.path()).expect("registry");
        let json = serde_json::to_string(registry.datasets()).expect("json");
        assert!(json.contains("\"slug\":\"wiki\""));
        assert!(json.contains("\"row_count\":20"));
    }
}
