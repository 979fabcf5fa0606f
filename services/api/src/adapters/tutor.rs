//! services/api/src/adapters/tutor.rs
//!
//! The study assistant the `/chat` route talks to. It answers from a small
//! built-in knowledge base when it can, then from an LRU reply cache, and
//! only then asks the remote model under a timeout. A remote failure or
//! timeout degrades to a deterministic local answer instead of an error.

use async_trait::async_trait;
use edugen_core::ports::{ChatReply, ChatService, PortError, PortResult, ReplySource};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, warn};

//=========================================================================================
// Local Knowledge Base
//=========================================================================================

struct Entry {
    subject: &'static str,
    keywords: &'static [&'static str],
    answer: &'static str,
}

const GENERAL: &str = "General";

const KNOWLEDGE: &[Entry] = &[
    Entry {
        subject: GENERAL,
        keywords: &["hello", "hi there", "hey"],
        answer: "Hello! I'm your study companion. Ask me about any subject you're working on.",
    },
    Entry {
        subject: GENERAL,
        keywords: &["noun"],
        answer: "A noun names a person, place, thing or idea, for example: student, India, book.",
    },
    Entry {
        subject: GENERAL,
        keywords: &["verb"],
        answer: "A verb describes an action, a state or an occurrence, for example: run, be, happen.",
    },
    Entry {
        subject: GENERAL,
        keywords: &["adjective"],
        answer: "An adjective describes a noun, for example: bright, quick, curious.",
    },
    Entry {
        subject: "Mathematics",
        keywords: &["pythagoras", "pythagorean"],
        answer: "Pythagoras' theorem: in a right triangle a² + b² = c², where c is the hypotenuse.",
    },
    Entry {
        subject: "Mathematics",
        keywords: &["area of circle", "area of a circle"],
        answer: "The area of a circle is πr², where r is its radius.",
    },
    Entry {
        subject: "Mathematics",
        keywords: &["value of pi"],
        answer: "π ≈ 3.14159. It is the ratio of a circle's circumference to its diameter.",
    },
    Entry {
        subject: "Physics",
        keywords: &["first law", "inertia"],
        answer: "Newton's first law: an object stays at rest or in uniform motion unless an external force acts on it.",
    },
    Entry {
        subject: "Physics",
        keywords: &["second law", "f=ma"],
        answer: "Newton's second law: force equals mass times acceleration (F = ma).",
    },
    Entry {
        subject: "Physics",
        keywords: &["relativity", "e=mc2"],
        answer: "General relativity describes gravity as the curvature of spacetime; E = mc² states mass-energy equivalence.",
    },
    Entry {
        subject: "Science",
        keywords: &["formula of water", "water formula"],
        answer: "The chemical formula of water is H₂O.",
    },
    Entry {
        subject: "History",
        keywords: &["indian independence", "india independence"],
        answer: "India gained independence from British rule on 15 August 1947.",
    },
    Entry {
        subject: "Logic",
        keywords: &["monty hall"],
        answer: "Monty Hall: always switch. Switching wins with probability 2/3.",
    },
];

const OFFLINE_ANSWER: &str = "I can't reach the tutor model right now. Try rephrasing, \
    or ask about a core concept in your subject and I'll answer from my notes.";

/// Looks `message` up in the subject's entries, then in the general ones.
pub fn local_answer(message: &str, subject: Option<&str>) -> Option<&'static str> {
    let query = message.to_lowercase();
    let subject = subject.unwrap_or(GENERAL);
    [subject, GENERAL].into_iter().find_map(|wanted| {
        KNOWLEDGE
            .iter()
            .filter(|e| e.subject.eq_ignore_ascii_case(wanted))
            .find(|e| e.keywords.iter().any(|k| query.contains(k)))
            .map(|e| e.answer)
    })
}

//=========================================================================================
// The Tutor
//=========================================================================================

pub struct Tutor {
    remote: Option<Arc<dyn ChatService>>,
    timeout: Duration,
    /// `None` when the configured size is zero.
    cache: Option<TokioMutex<LruCache<String, String>>>,
}

impl Tutor {
    /// `remote` is `None` when no model is configured; every reply is then local.
    pub fn new(remote: Option<Arc<dyn ChatService>>, timeout: Duration, cache_size: usize) -> Self {
        Self {
            remote,
            timeout,
            cache: NonZeroUsize::new(cache_size).map(|size| TokioMutex::new(LruCache::new(size))),
        }
    }

    async fn cached(&self, key: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        cache.lock().await.get(key).cloned()
    }

    async fn remember(&self, key: String, text: String) {
        if let Some(cache) = &self.cache {
            cache.lock().await.put(key, text);
        }
    }

    /// Number of replies currently cached.
    pub async fn cached_replies(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.lock().await.len(),
            None => 0,
        }
    }
}

fn cache_key(message: &str, subject: Option<&str>) -> String {
    format!("{}:{}", subject.unwrap_or(GENERAL), message.to_lowercase())
}

fn offline() -> ChatReply {
    ChatReply {
        text: OFFLINE_ANSWER.to_string(),
        source: ReplySource::Local,
    }
}

#[async_trait]
impl ChatService for Tutor {
    async fn reply(&self, message: &str, subject: Option<&str>) -> PortResult<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PortError::Invalid("message must not be empty".to_string()));
        }

        if let Some(answer) = local_answer(message, subject) {
            return Ok(ChatReply {
                text: answer.to_string(),
                source: ReplySource::Local,
            });
        }

        let key = cache_key(message, subject);
        if let Some(text) = self.cached(&key).await {
            debug!("Chat reply served from cache");
            return Ok(ChatReply {
                text,
                source: ReplySource::Cache,
            });
        }

        let Some(remote) = &self.remote else {
            return Ok(offline());
        };

        match tokio::time::timeout(self.timeout, remote.reply(message, subject)).await {
            Ok(Ok(reply)) => {
                self.remember(key, reply.text.clone()).await;
                Ok(reply)
            }
            Ok(Err(e)) => {
                warn!("Chat model failed, answering locally: {}", e);
                Ok(offline())
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs_f64(), "Chat model timed out, answering locally");
                Ok(offline())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl ChatService for CountingModel {
        async fn reply(&self, message: &str, _subject: Option<&str>) -> PortResult<ChatReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(ChatReply {
                text: format!("model says: {}", message),
                source: ReplySource::Remote,
            })
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatService for FailingModel {
        async fn reply(&self, _message: &str, _subject: Option<&str>) -> PortResult<ChatReply> {
            Err(PortError::Unavailable("quota exhausted".to_string()))
        }
    }

    fn model(delay: Duration) -> Arc<CountingModel> {
        Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    #[test]
    fn local_answers_prefer_the_subject() {
        assert!(local_answer("Explain the SECOND LAW please", Some("Physics"))
            .unwrap()
            .contains("F = ma"));
        assert!(local_answer("what is a noun?", Some("Physics")).is_some());
        assert!(local_answer("second law", Some("History")).is_none());
    }

    #[tokio::test]
    async fn knowledge_base_skips_the_model() {
        let remote = model(Duration::ZERO);
        let tutor = Tutor::new(Some(remote.clone()), Duration::from_secs(1), 10);
        let reply = tutor.reply("what is pythagoras", Some("Mathematics")).await.unwrap();
        assert_eq!(reply.source, ReplySource::Local);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_question_is_served_from_cache() {
        let remote = model(Duration::ZERO);
        let tutor = Tutor::new(Some(remote.clone()), Duration::from_secs(1), 10);

        let first = tutor.reply("Explain photosynthesis", None).await.unwrap();
        assert_eq!(first.source, ReplySource::Remote);
        let second = tutor.reply("explain photosynthesis", None).await.unwrap();
        assert_eq!(second.source, ReplySource::Cache);
        assert_eq!(second.text, first.text);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_model_falls_back_locally() {
        let tutor = Tutor::new(Some(model(Duration::from_secs(5))), Duration::from_millis(20), 10);
        let reply = tutor.reply("Explain photosynthesis", None).await.unwrap();
        assert_eq!(reply.source, ReplySource::Local);
        assert_eq!(reply.text, OFFLINE_ANSWER);
    }

    #[tokio::test]
    async fn failing_model_falls_back_and_is_not_cached() {
        let tutor = Tutor::new(Some(Arc::new(FailingModel)), Duration::from_secs(1), 10);
        let reply = tutor.reply("Explain photosynthesis", None).await.unwrap();
        assert_eq!(reply.source, ReplySource::Local);
        assert_eq!(tutor.cached_replies().await, 0);
    }

    #[tokio::test]
    async fn cache_keeps_the_most_recently_used_replies() {
        let remote = model(Duration::ZERO);
        let tutor = Tutor::new(Some(remote.clone()), Duration::from_secs(1), 2);

        tutor.reply("explain osmosis", None).await.unwrap();
        tutor.reply("explain entropy", None).await.unwrap();
        // Touch osmosis so entropy becomes the eviction candidate.
        tutor.reply("explain osmosis", None).await.unwrap();
        tutor.reply("explain mitosis", None).await.unwrap();
        assert_eq!(tutor.cached_replies().await, 2);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 3);

        let osmosis = tutor.reply("explain osmosis", None).await.unwrap();
        assert_eq!(osmosis.source, ReplySource::Cache);
        let entropy = tutor.reply("explain entropy", None).await.unwrap();
        assert_eq!(entropy.source, ReplySource::Remote);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_cache_size_disables_caching() {
        let remote = model(Duration::ZERO);
        let tutor = Tutor::new(Some(remote.clone()), Duration::from_secs(1), 0);

        tutor.reply("explain osmosis", None).await.unwrap();
        let again = tutor.reply("explain osmosis", None).await.unwrap();

        assert_eq!(again.source, ReplySource::Remote);
        assert_eq!(tutor.cached_replies().await, 0);
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let tutor = Tutor::new(None, Duration::from_secs(1), 10);
        assert!(matches!(tutor.reply("   ", None).await, Err(PortError::Invalid(_))));
    }
}
