//! Artifact filename policy for auto-saved videos.
//!
//! Saved files are named `{index+1}_{sanitized-prompt}_{suffix}.mp4` so
//! a directory listing keeps prompt order, and a download is skipped
//! when a file for the same prompt index already exists.

/// Longest sanitized prompt fragment embedded in a filename.
const MAX_PROMPT_FRAGMENT_LEN: usize = 30;

/// Replace every character outside `[a-zA-Z0-9]` with an underscore.
pub fn sanitize_prompt(prompt: &str) -> String {
    prompt
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Build the filename for a saved artifact.
///
/// `index` is the zero-based prompt position; filenames are numbered
/// from 1. `suffix` is a short random fragment to avoid collisions
/// between repeated runs.
pub fn artifact_filename(index: usize, prompt: &str, suffix: &str) -> String {
    let mut fragment = sanitize_prompt(prompt);
    fragment.truncate(MAX_PROMPT_FRAGMENT_LEN);
    format!("{}_{}_{}.mp4", index + 1, fragment, suffix)
}

/// Prefix that identifies any artifact saved for the given prompt index.
pub fn artifact_prefix(index: usize) -> String {
    format!("{}_", index + 1)
}

/// Whether a directory listing already contains an artifact for the
/// given prompt index.
pub fn has_existing_artifact<'a>(
    mut existing_files: impl Iterator<Item = &'a str>,
    index: usize,
) -> bool {
    let prefix = artifact_prefix(index);
    existing_files.any(|name| name.starts_with(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_punctuation_and_spaces() {
        assert_eq!(sanitize_prompt("a cat, surfing!"), "a_cat__surfing_");
    }

    #[test]
    fn filename_is_one_based_and_truncated() {
        let prompt = "a very long prompt describing an elaborate scene in detail";
        let name = artifact_filename(0, prompt, "abc123");
        assert!(name.starts_with("1_"));
        assert!(name.ends_with("_abc123.mp4"));
        // 30-char fragment plus numbering, suffix, and extension.
        assert!(name.len() <= 2 + MAX_PROMPT_FRAGMENT_LEN + 1 + 6 + 4);
    }

    #[test]
    fn existing_artifact_detected_by_index_prefix() {
        let files = ["1_a_cat_abc123.mp4", "3_a_dog_def456.mp4"];
        assert!(has_existing_artifact(files.iter().copied(), 0));
        assert!(!has_existing_artifact(files.iter().copied(), 1));
        assert!(has_existing_artifact(files.iter().copied(), 2));
    }

    #[test]
    fn index_ten_does_not_match_index_one() {
        let files = ["11_a_cat_abc123.mp4"];
        assert!(!has_existing_artifact(files.iter().copied(), 0));
        assert!(has_existing_artifact(files.iter().copied(), 10));
    }
}
