use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

// Two token shapes are recognized in commit messages: "#task-42" and
// "task:42", both case-insensitive.
static HASH_TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#task-(\d+)").expect("invalid task ref pattern"));
static TASK_COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btask:(\d+)").expect("invalid task ref pattern"));

/// Extracts the deduplicated task reference numbers from a commit message,
/// in order of first appearance. Tokens whose number does not parse are
/// skipped; a message with no tokens yields an empty list.
pub fn extract_task_refs(message: &str) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for regex in [&*HASH_TASK_RE, &*TASK_COLON_RE] {
        for capture in regex.captures_iter(message) {
            let Ok(number) = capture[1].parse::<i64>() else {
                continue;
            };
            if seen.insert(number) {
                refs.push(number);
            }
        }
    }

    refs
}
