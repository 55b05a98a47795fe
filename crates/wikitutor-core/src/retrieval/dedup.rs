use std::collections::HashSet;

use tracing::debug;

use super::resolver::Canonicalizer;

/// Canonicalize ranked candidates, dropping the main topic, duplicates and
/// anything that does not canonicalize.
///
/// Order-preserving: the first candidate to reach a canonical title keeps
/// its position. One canonicalization per candidate, in order.
pub async fn dedup<C>(candidates: &[String], main_topic: &str, canonicalizer: &C) -> Vec<String>
where
    C: Canonicalizer + ?Sized,
{
    let mut seen = HashSet::new();
    if let Some(main) = canonicalizer.canonicalize(main_topic).await {
        seen.insert(main);
    }

    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(canonical) = canonicalizer.canonicalize(candidate).await else {
            debug!(candidate = %candidate, "Dropping candidate that does not resolve");
            continue;
        };
        if seen.insert(canonical.clone()) {
            unique.push(canonical);
        }
    }

    unique
}
