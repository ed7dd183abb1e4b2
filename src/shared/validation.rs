/// Characters that are never legal in a filename, regardless of platform.
///
/// This is the Windows invalid-filename set (the strictest of the common
/// platforms): the reserved punctuation below plus all ASCII control
/// characters. Matching the strict set keeps uploaded names portable.
const INVALID_FILENAME_CHARS: &[char] = &['"', '<', '>', '|', ':', '*', '?', '\\', '/'];

/// Returns false iff the name contains a character that is illegal in a
/// filename. An empty name passes this check; callers reject empty names
/// separately.
pub fn is_valid_filename(name: &str) -> bool {
    !name
        .chars()
        .any(|c| c.is_control() || INVALID_FILENAME_CHARS.contains(&c))
}
