use crate::config::Feature;
use crate::index::{FeatureIndex, IndexSet, PositionalIndex, ReviewIndex};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const TITLE_FILE: &str = "title_index.jsonl";
const DESCRIPTION_FILE: &str = "description_index.jsonl";
const REVIEWS_FILE: &str = "reviews_index.jsonl";
const DOCUMENTS_FILE: &str = "documents.jsonl";
const SNAPSHOT_FILE: &str = "indices.bin";

#[derive(Debug, Serialize, Deserialize)]
struct DocumentEntry {
    url: String,
}

/// Flat-file index directory: one JSONL file per index, one `{key: value}`
/// record per line in ascending key order.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Open or create an index directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create index directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn feature_file(feature: Feature) -> String {
        format!("{}_index.jsonl", feature.as_str())
    }

    // ========== Index Files ==========

    /// Write every index of the set.
    ///
    /// A snapshot left by an earlier build no longer matches the files and is
    /// removed.
    pub fn save(&self, indices: &IndexSet) -> Result<()> {
        let snapshot = self.root.join(SNAPSHOT_FILE);
        if snapshot.exists() {
            fs::remove_file(&snapshot)
                .with_context(|| format!("Failed to remove stale snapshot {}", snapshot.display()))?;
        }

        self.write_entries(TITLE_FILE, indices.title.iter())?;
        self.write_entries(DESCRIPTION_FILE, indices.description.iter())?;
        for (feature, index) in &indices.features {
            self.write_entries(&Self::feature_file(*feature), index.iter())?;
        }
        self.write_entries(REVIEWS_FILE, indices.reviews.iter())?;

        let mut writer = self.create(DOCUMENTS_FILE)?;
        for url in &indices.documents {
            let line = serde_json::to_string(&DocumentEntry { url: url.clone() })?;
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;

        tracing::info!(path = %self.root.display(), documents = indices.documents.len(), "saved indices");
        Ok(())
    }

    /// Load every index of the set into memory
    pub fn load(&self) -> Result<IndexSet> {
        let documents: Vec<String> = self
            .read_lines::<DocumentEntry>(DOCUMENTS_FILE)?
            .into_iter()
            .map(|entry| entry.url)
            .collect();

        let title = PositionalIndex::from_postings(self.read_entries(TITLE_FILE)?);
        let description = PositionalIndex::from_postings(self.read_entries(DESCRIPTION_FILE)?);

        let mut features = BTreeMap::new();
        for feature in Feature::ALL {
            let file = Self::feature_file(feature);
            if self.root.join(&file).exists() {
                features.insert(feature, FeatureIndex::from_values(self.read_entries(&file)?));
            }
        }

        let reviews: ReviewIndex = self.read_entries(REVIEWS_FILE)?;

        let indices = IndexSet {
            documents,
            title,
            description,
            features,
            reviews,
        };
        tracing::info!(path = %self.root.display(), documents = indices.documents.len(), "loaded indices");
        Ok(indices)
    }

    // ========== Snapshot ==========

    /// Save the whole set as a single bincode file
    pub fn save_snapshot(&self, indices: &IndexSet) -> Result<()> {
        let mut writer = self.create(SNAPSHOT_FILE)?;
        bincode::serialize_into(&mut writer, indices).context("Failed to write index snapshot")?;
        writer.flush()?;
        Ok(())
    }

    /// Load a bincode snapshot, if one exists
    pub fn load_snapshot(&self) -> Result<Option<IndexSet>> {
        let path = self.root.join(SNAPSHOT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        let indices = bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Ok(Some(indices))
    }

    /// Prefer the snapshot, fall back to the JSONL files
    pub fn load_any(&self) -> Result<IndexSet> {
        match self.load_snapshot()? {
            Some(indices) => Ok(indices),
            None => self.load(),
        }
    }

    // ========== Helpers ==========

    fn create(&self, name: &str) -> Result<BufWriter<File>> {
        let path = self.root.join(name);
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(BufWriter::new(file))
    }

    fn write_entries<'a, V, I>(&self, name: &str, entries: I) -> Result<()>
    where
        V: Serialize + 'a,
        I: Iterator<Item = (&'a String, &'a V)>,
    {
        let mut writer = self.create(name)?;
        for (key, value) in entries {
            let mut record = BTreeMap::new();
            record.insert(key, value);
            writeln!(writer, "{}", serde_json::to_string(&record)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn read_lines<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.root.join(name);
        let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;

        let mut records = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: malformed record", path.display(), line_no + 1))?;
            records.push(record);
        }
        Ok(records)
    }

    fn read_entries<V: DeserializeOwned>(&self, name: &str) -> Result<BTreeMap<String, V>> {
        let mut entries = BTreeMap::new();
        for record in self.read_lines::<BTreeMap<String, V>>(name)? {
            entries.extend(record);
        }
        Ok(entries)
    }
}

// ========== Query Responses ==========

/// `{query: [[url, score], ...]}`
pub type Responses = BTreeMap<String, Vec<(String, f64)>>;

/// Merge responses into a JSON file, keeping answers to other queries.
///
/// An existing file that is not valid JSON is replaced.
pub fn save_responses<P: AsRef<Path>>(path: P, responses: &Responses) -> Result<()> {
    let path = path.as_ref();
    let mut merged: Responses = if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "replacing malformed responses file");
            Responses::new()
        })
    } else {
        Responses::new()
    };

    merged.extend(responses.iter().map(|(k, v)| (k.clone(), v.clone())));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&merged)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
