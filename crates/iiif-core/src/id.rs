use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Every annotation id seen by this process, deduplicated.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// The `@id` (Presentation 2) or `id` (Presentation 3) of an annotation,
/// stored once in the interner and passed around as a `Spur` key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnnotationId(Spur);

impl AnnotationId {
    /// Look `s` up in the interner, adding it on first sight.
    pub fn intern(s: &str) -> Self {
        AnnotationId(INTERNER.get_or_intern(s))
    }

    /// The original id text.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Mint a fresh identifier under `base` (usually the manifest id).
    ///
    /// `stamp_ms` is the caller's clock; the counter keeps ids unique when
    /// several annotations are minted within the same millisecond.
    pub fn mint(base: &str, stamp_ms: u64) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let base = base.trim_end_matches('/');
        Self::intern(&format!("{base}/annotation/{n}-{stamp_ms}"))
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.as_str())
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AnnotationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AnnotationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(AnnotationId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_interns_to_same_key() {
        let a = AnnotationId::intern("https://example.org/anno/1");
        let b = AnnotationId::intern("https://example.org/anno/1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://example.org/anno/1");
    }

    #[test]
    fn minted_ids_are_unique_within_one_millisecond() {
        let a = AnnotationId::mint("https://example.org/manifest", 1_700_000_000_000);
        let b = AnnotationId::mint("https://example.org/manifest/", 1_700_000_000_000);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("https://example.org/manifest/annotation/"));
        assert!(b.as_str().starts_with("https://example.org/manifest/annotation/"));
    }
}
