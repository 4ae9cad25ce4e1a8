/// Check whether a bus topic can be used verbatim as a storage table name
///
/// Only ASCII letters, digits and underscores are accepted, and the topic must be
/// non-empty. Topics are interpolated into SQL as identifiers, so anything else is
/// refused rather than rewritten: `a/b` is not silently turned into `a_b`.
pub fn is_valid_topic(topic: &str) -> bool {
    !topic.is_empty()
        && topic
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_identifiers() {
        assert!(is_valid_topic("alerts"));
        assert!(is_valid_topic("Sensor_01"));
        assert!(is_valid_topic("_"));
        assert!(is_valid_topic("123"));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(!is_valid_topic(""));
    }

    #[test]
    fn test_rejects_separators_and_injection() {
        assert!(!is_valid_topic("home/kitchen"));
        assert!(!is_valid_topic("alerts; DROP TABLE settings"));
        assert!(!is_valid_topic("a-b"));
        assert!(!is_valid_topic("with space"));
        assert!(!is_valid_topic("quote\""));
        assert!(!is_valid_topic("#"));
    }

    #[test]
    fn test_rejects_non_ascii() {
        assert!(!is_valid_topic("température"));
        assert!(!is_valid_topic("日志"));
    }
}
