use md5::{Digest, Md5};

const UNSAFE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const MAX_KEY_LEN: usize = 200;

/// Turns an arbitrary cache key into a filesystem-safe file name.
///
/// Unsafe characters (and spaces) become `_`. Keys longer than 200
/// characters after that substitution collapse to a short hash so a single
/// absurdly long parameter set can't blow past filename length limits.
pub fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c == ' ' {
                '_'
            } else {
                c
            }
        })
        .collect();

    if cleaned.len() <= MAX_KEY_LEN {
        return cleaned;
    }

    let mut hasher = Md5::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    let hex16: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();

    let prefix: String = cleaned.chars().take(32).collect();
    format!("{prefix}_{hex16}")
}
