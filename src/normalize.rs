//! Turning a raw completion into a bare, runnable command line.

const FENCE: &str = "```";

/// Strip one layer of markdown formatting from a completion.
///
/// A triple-backtick fence is removed along with everything up to the first
/// newline inside it (the language tag line, empty for an untagged fence);
/// otherwise backticks wrapping the whole text are removed. The result is trimmed either way. Whitespace-only
/// input yields an empty string, meaning no command was produced.
pub fn normalize(raw: &str) -> String {
    let text = raw.trim();

    if text.len() >= 2 * FENCE.len() && text.starts_with(FENCE) && text.ends_with(FENCE) {
        let inner = &text[FENCE.len()..text.len() - FENCE.len()];
        let body = match inner.split_once('\n') {
            Some((_, rest)) => rest,
            None => inner,
        };
        return body.trim().to_string();
    }

    if text.starts_with('`') && text.ends_with('`') {
        return text.trim_matches('`').trim().to_string();
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command_unchanged() {
        assert_eq!(normalize("echo hi"), "echo hi");
        assert_eq!(normalize("  ls -la\n"), "ls -la");
    }

    #[test]
    fn test_fenced_block_with_language_tag() {
        assert_eq!(normalize("```bash\nls -la\n```"), "ls -la");
        assert_eq!(normalize("```sh\nfind . -name '*.rs'\n```\n"), "find . -name '*.rs'");
    }

    #[test]
    fn test_fenced_block_on_one_line() {
        assert_eq!(normalize("```pwd```"), "pwd");
    }

    #[test]
    fn test_fenced_block_keeps_multiline_body() {
        assert_eq!(
            normalize("```bash\ncd /tmp &&\n  ls\n```"),
            "cd /tmp &&\n  ls"
        );
    }

    #[test]
    fn test_fence_without_tag_keeps_every_line() {
        assert_eq!(normalize("```\nmkdir a\nmkdir b\n```"), "mkdir a\nmkdir b");
        assert_eq!(normalize("```\ncd build\nrm -rf *\n```"), "cd build\nrm -rf *");
        assert_eq!(normalize("```\nls -la\n```"), "ls -la");
    }

    #[test]
    fn test_tag_line_with_trailing_space() {
        assert_eq!(normalize("```bash \nuname -a\n```"), "uname -a");
    }

    #[test]
    fn test_single_backticks() {
        assert_eq!(normalize("`pwd`"), "pwd");
        assert_eq!(normalize("` du -sh . `"), "du -sh .");
    }

    #[test]
    fn test_fence_contents_are_not_reprocessed() {
        assert_eq!(normalize("```bash\n`ls`\n```"), "`ls`");
    }

    #[test]
    fn test_doubled_backticks() {
        assert_eq!(normalize("``ls``"), "ls");
    }

    #[test]
    fn test_inner_backticks_preserved() {
        assert_eq!(normalize("echo `date`"), "echo `date`");
        assert_eq!(normalize("`echo` hi"), "`echo` hi");
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
        assert_eq!(normalize("`"), "");
        assert_eq!(normalize("```"), "");
        assert_eq!(normalize("``"), "");
        assert_eq!(normalize("``````"), "");
    }

    #[test]
    fn test_unfenced_input_is_just_trimmed() {
        for raw in ["ls", " git status ", "grep -rn foo .\n", "a | b && c"] {
            assert_eq!(normalize(raw), raw.trim());
        }
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "```bash\nls -la\n```",
            "`pwd`",
            "echo hi",
            "```\nmkdir a\nmkdir b\n```",
            "   ",
            "```pwd```",
            "` du -sh . `",
            "``ls``",
        ];
        for raw in samples {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", raw);
        }
    }
}
