use crate::tokenizer::Tokenizer;
use std::collections::BTreeMap;
use std::path::Path;

/// Symmetric synonym table, built once and never mutated.
///
/// Each group has a representative token and a list of members. Looking up
/// any token of a group yields the other tokens of that group.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    groups: BTreeMap<String, Vec<String>>,
    // member -> representatives of every group it belongs to
    members: BTreeMap<String, Vec<String>>,
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(groups: BTreeMap<String, Vec<String>>) -> Self {
        let groups: BTreeMap<String, Vec<String>> = groups
            .into_iter()
            .map(|(rep, syns)| {
                let rep = rep.to_lowercase();
                let mut members: Vec<String> = Vec::with_capacity(syns.len());
                for syn in syns.into_iter().map(|s| s.to_lowercase()) {
                    if syn != rep && !members.contains(&syn) {
                        members.push(syn);
                    }
                }
                (rep, members)
            })
            .collect();

        let mut members: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (rep, syns) in &groups {
            for syn in syns {
                members.entry(syn.clone()).or_default().push(rep.clone());
            }
        }

        Self { groups, members }
    }

    /// Load a `{representative: [synonym, ...]}` JSON file.
    ///
    /// A missing or unreadable file is not fatal: expansion degrades to the
    /// identity.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_json::from_str::<BTreeMap<String, Vec<String>>>(&raw).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(groups) => {
                let table = Self::new(groups);
                tracing::info!(path = %path.display(), groups = table.len(), "loaded synonyms");
                table
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "synonym file unavailable, expanding queries without synonyms"
                );
                Self::empty()
            }
        }
    }

    /// Synonyms of `token`, excluding `token` itself. Builds a fresh list on
    /// every call.
    pub fn lookup(&self, token: &str) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        let mut push = |candidate: &String| {
            if candidate != token && !result.contains(candidate) {
                result.push(candidate.clone());
            }
        };

        if let Some(syns) = self.groups.get(token) {
            syns.iter().for_each(&mut push);
        }
        if let Some(reps) = self.members.get(token) {
            for rep in reps {
                push(rep);
                if let Some(syns) = self.groups.get(rep) {
                    syns.iter().for_each(&mut push);
                }
            }
        }
        result
    }

    /// Processed query tokens followed by the synonyms of each, in order
    pub fn expand_query(&self, tokenizer: &Tokenizer, raw_query: &str) -> Vec<String> {
        let tokens = tokenizer.process(raw_query);
        let expansions: Vec<String> = tokens.iter().flat_map(|t| self.lookup(t)).collect();
        tokens.into_iter().chain(expansions).collect()
    }

    /// Number of synonym groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
