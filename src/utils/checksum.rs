use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex encoded SHA-256 of the JSON representation of `data`.
///
/// Maps serialize with sorted keys, so the checksum of secret data only
/// changes when its content does.
pub fn compute_checksum<T: Serialize + ?Sized>(data: &T) -> serde_json::Result<String> {
    let encoded = serde_json::to_vec(data)?;
    Ok(format!("{:x}", Sha256::digest(encoded)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::ByteString;

    use super::*;

    #[test]
    fn checksum_is_stable_and_content_addressed() {
        let data = BTreeMap::from([
            ("b".to_string(), ByteString(b"second".to_vec())),
            ("a".to_string(), ByteString(b"first".to_vec())),
        ]);
        let same = BTreeMap::from([
            ("a".to_string(), ByteString(b"first".to_vec())),
            ("b".to_string(), ByteString(b"second".to_vec())),
        ]);
        let changed = BTreeMap::from([("a".to_string(), ByteString(b"other".to_vec()))]);

        let checksum = compute_checksum(&data).unwrap();
        assert_eq!(64, checksum.len());
        assert_eq!(checksum, compute_checksum(&same).unwrap());
        assert_ne!(checksum, compute_checksum(&changed).unwrap());
    }

    #[test]
    fn checksum_of_empty_map() {
        // sha256("{}")
        assert_eq!(
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            compute_checksum(&BTreeMap::<String, ByteString>::new()).unwrap()
        );
    }
}
