//! In-process stand-ins for the model, the embedder and the vector index.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient};
use crate::memory::{Embedder, MemoryRecord, QueryMatch, VectorIndex};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
    pub options: CompletionOptions,
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail,
}

struct Rule {
    needle: String,
    replies: Vec<Reply>,
    served: usize,
}

/// LLM that answers by prompt substring.
///
/// Rules are checked in the order they were added; the first rule whose
/// needle occurs in the prompt serves its next reply, repeating the last one
/// once the list runs out. A prompt no rule matches is an error.
#[derive(Default)]
pub struct ScriptedLlm {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<'a>(self, needle: &str, responses: impl IntoIterator<Item = &'a str>) -> Self {
        let replies = responses
            .into_iter()
            .map(|r| Reply::Text(r.to_string()))
            .collect();
        self.rule(needle, replies)
    }

    /// Fail `failures` times before serving `responses`.
    pub fn fail_then<'a>(
        self,
        needle: &str,
        failures: usize,
        responses: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let replies = std::iter::repeat(Reply::Fail)
            .take(failures)
            .chain(responses.into_iter().map(|r| Reply::Text(r.to_string())))
            .collect();
        self.rule(needle, replies)
    }

    fn rule(self, needle: &str, replies: Vec<Reply>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            replies,
            served: 0,
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded prompts containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: CompletionOptions,
    ) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
            options,
        });

        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|r| prompt.contains(&r.needle))
            .ok_or_else(|| anyhow::anyhow!("no scripted reply for prompt: {}", prompt))?;

        let reply = rule
            .replies
            .get(rule.served)
            .or_else(|| rule.replies.last())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("rule '{}' has no replies", rule.needle))?;
        rule.served += 1;

        match reply {
            Reply::Text(text) => Ok(text.trim().to_string()),
            Reply::Fail => Err(anyhow::anyhow!("scripted failure for '{}'", rule.needle)),
        }
    }
}

const HASH_DIMENSION: usize = 64;

/// Bag-of-words embedder: each lowercased word bumps one hashed bucket.
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vector = vec![0.0f32; HASH_DIMENSION];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % HASH_DIMENSION as u64) as usize] += 1.0;
        }
        Ok(vector)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Cosine-similarity index kept in memory. Upserts replace by id.
#[derive(Default)]
pub struct InMemoryIndex {
    records: Mutex<Vec<MemoryRecord>>,
}

impl InMemoryIndex {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[MemoryRecord]) -> anyhow::Result<()> {
        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record.clone());
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> anyhow::Result<Vec<QueryMatch>> {
        let stored = self.records.lock().unwrap();
        let mut matches: Vec<QueryMatch> = stored
            .iter()
            .map(|r| QueryMatch {
                id: r.id.clone(),
                score: cosine(embedding, &r.embedding),
                metadata: Some(r.metadata.clone()),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }
}

/// Index that ignores writes and always answers with the same matches, in
/// the given order.
pub struct StaticIndex {
    matches: Vec<QueryMatch>,
}

impl StaticIndex {
    pub fn new(matches: Vec<QueryMatch>) -> Self {
        Self { matches }
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn upsert(&self, _records: &[MemoryRecord]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn query(&self, _embedding: &[f32], top_k: usize) -> anyhow::Result<Vec<QueryMatch>> {
        Ok(self.matches.iter().take(top_k).cloned().collect())
    }
}
