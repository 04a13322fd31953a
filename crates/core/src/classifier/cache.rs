//! Judgment cache keyed by video and topic-list fingerprint.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

use super::types::Judgment;
use crate::video::VideoRef;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A judgment and when it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedJudgment {
    pub judgment: Judgment,
    pub cached_at: DateTime<Utc>,
}

impl CachedJudgment {
    /// Whether the entry is younger than `ttl` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.cached_at) < ttl,
            // Longer than chrono can represent.
            Err(_) => true,
        }
    }
}

/// Storage for well-formed judgments.
pub trait JudgmentCache: Send + Sync {
    fn get(&self, video: &VideoRef, fingerprint: &str) -> Result<Option<CachedJudgment>, CacheError>;

    fn put(
        &self,
        video: &VideoRef,
        fingerprint: &str,
        judgment: &Judgment,
        cached_at: DateTime<Utc>,
    ) -> Result<(), CacheError>;
}

/// Per-process judgment cache.
#[derive(Default)]
pub struct MemoryJudgmentCache {
    entries: Mutex<HashMap<(VideoRef, String), CachedJudgment>>,
}

impl MemoryJudgmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(VideoRef, String), CachedJudgment>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl JudgmentCache for MemoryJudgmentCache {
    fn get(&self, video: &VideoRef, fingerprint: &str) -> Result<Option<CachedJudgment>, CacheError> {
        Ok(self
            .lock()
            .get(&(video.clone(), fingerprint.to_string()))
            .cloned())
    }

    fn put(
        &self,
        video: &VideoRef,
        fingerprint: &str,
        judgment: &Judgment,
        cached_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        self.lock().insert(
            (video.clone(), fingerprint.to_string()),
            CachedJudgment {
                judgment: judgment.clone(),
                cached_at,
            },
        );
        Ok(())
    }
}

/// SQLite-backed judgment cache, shared across runs.
pub struct SqliteJudgmentCache {
    conn: Mutex<Connection>,
}

impl SqliteJudgmentCache {
    /// Open (or create) the cache database at `path`.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS relevance_judgments (
                video_id TEXT NOT NULL,
                topics_fingerprint TEXT NOT NULL,
                score REAL NOT NULL,
                matched_topics TEXT NOT NULL,
                rationale TEXT,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (video_id, topics_fingerprint)
            );
            "#,
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JudgmentCache for SqliteJudgmentCache {
    fn get(&self, video: &VideoRef, fingerprint: &str) -> Result<Option<CachedJudgment>, CacheError> {
        let conn = self.lock();

        let result = conn.query_row(
            "SELECT score, matched_topics, rationale, cached_at FROM relevance_judgments
             WHERE video_id = ? AND topics_fingerprint = ?",
            params![video.as_str(), fingerprint],
            |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        );

        let (score, matched_topics, rationale, cached_at) = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(CacheError::Database(e.to_string())),
        };

        let matched_topics: Vec<String> = serde_json::from_str(&matched_topics)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        let cached_at = DateTime::parse_from_rfc3339(&cached_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        Ok(Some(CachedJudgment {
            judgment: Judgment {
                score: score as f32,
                matched_topics,
                rationale,
            },
            cached_at,
        }))
    }

    fn put(
        &self,
        video: &VideoRef,
        fingerprint: &str,
        judgment: &Judgment,
        cached_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let matched_topics = serde_json::to_string(&judgment.matched_topics)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        self.lock()
            .execute(
                "INSERT OR REPLACE INTO relevance_judgments
                 (video_id, topics_fingerprint, score, matched_topics, rationale, cached_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    video.as_str(),
                    fingerprint,
                    judgment.score as f64,
                    matched_topics,
                    judgment.rationale,
                    cached_at.to_rfc3339(),
                ],
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn video() -> VideoRef {
        VideoRef::new("dQw4w9WgXcQ").unwrap()
    }

    fn judgment() -> Judgment {
        Judgment {
            score: 0.75,
            matched_topics: vec!["rust".to_string()],
            rationale: Some("About Rust".to_string()),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, hour, 0, 0).unwrap()
    }

    fn exercise(cache: &dyn JudgmentCache) {
        assert!(cache.get(&video(), "fp").unwrap().is_none());

        cache.put(&video(), "fp", &judgment(), at(1)).unwrap();
        let cached = cache.get(&video(), "fp").unwrap().unwrap();
        assert_eq!(cached.judgment, judgment());
        assert_eq!(cached.cached_at, at(1));

        // Different topic list, different key.
        assert!(cache.get(&video(), "other").unwrap().is_none());

        // Overwrite.
        cache.put(&video(), "fp", &judgment(), at(2)).unwrap();
        assert_eq!(cache.get(&video(), "fp").unwrap().unwrap().cached_at, at(2));
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryJudgmentCache::new();
        exercise(&cache);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sqlite_cache() {
        exercise(&SqliteJudgmentCache::in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("judgments.db");

        SqliteJudgmentCache::new(&path)
            .unwrap()
            .put(&video(), "fp", &judgment(), at(1))
            .unwrap();

        let reopened = SqliteJudgmentCache::new(&path).unwrap();
        assert!(reopened.get(&video(), "fp").unwrap().is_some());
    }

    #[test]
    fn test_freshness() {
        let cached = CachedJudgment {
            judgment: judgment(),
            cached_at: at(1),
        };
        assert!(cached.is_fresh(at(2), Duration::from_secs(7200)));
        assert!(!cached.is_fresh(at(3), Duration::from_secs(7200)));
        assert!(cached.is_fresh(at(3), Duration::MAX));
    }
}
