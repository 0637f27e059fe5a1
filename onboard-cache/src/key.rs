use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::CacheResult;

/// Builds a `prefix:sha256` key from the JSON form of `query`.
///
/// Equal queries always map to the same key; keys with different prefixes
/// never collide.
pub fn cache_key<Q: Serialize + ?Sized>(prefix: &str, query: &Q) -> CacheResult<String> {
    let bytes = serde_json::to_vec(query)?;
    Ok(format!("{prefix}:{}", hex::encode(Sha256::digest(&bytes))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_query_same_key() {
        let a = cache_key("users", &json!({"age": 30})).unwrap();
        let b = cache_key("users", &json!({"age": 30})).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("users:"));
        assert_eq!(a.len(), "users:".len() + 64);
    }

    #[test]
    fn prefix_and_query_both_matter() {
        let base = cache_key("users", &json!({"age": 30})).unwrap();
        assert_ne!(base, cache_key("books", &json!({"age": 30})).unwrap());
        assert_ne!(base, cache_key("users", &json!({"age": 31})).unwrap());
    }
}
