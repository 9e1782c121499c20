//! Script-run scanning shared by all segmentation engines.
//!
//! Every engine first splits the input into maximal runs of one script
//! class. Only Thai runs differ between engines; Latin, numeric, and
//! punctuation runs pass through as single tokens and whitespace runs are
//! skipped, which keeps mixed-script input away from dictionary lookup.

use crate::segment::token::{Script, Token, script_of};

/// A maximal run of characters in one script class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    /// Script class of every character in the run.
    pub script: Script,

    /// Character offset of the first character.
    pub char_start: usize,

    /// Character offset one past the last character.
    pub char_end: usize,

    /// Byte offset of the first character.
    pub byte_start: usize,

    /// Byte offset one past the last character.
    pub byte_end: usize,
}

impl Run {
    /// Number of characters in the run.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Split text into maximal script runs covering every character.
pub fn scan_runs(text: &str) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut current: Option<Run> = None;
    let mut char_pos = 0;

    for (byte_pos, c) in text.char_indices() {
        let script = script_of(c);
        let char_end = char_pos + 1;
        let byte_end = byte_pos + c.len_utf8();

        match current.as_mut() {
            Some(run) if run.script == script => {
                run.char_end = char_end;
                run.byte_end = byte_end;
            }
            _ => {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
                current = Some(Run {
                    script,
                    char_start: char_pos,
                    char_end,
                    byte_start: byte_pos,
                    byte_end,
                });
            }
        }
        char_pos = char_end;
    }

    if let Some(run) = current {
        runs.push(run);
    }
    runs
}

/// Emit the pass-through token for a non-Thai run, or `None` for
/// whitespace.
pub fn passthrough_token(text: &str, run: &Run) -> Option<Token> {
    if run.script == Script::Whitespace {
        return None;
    }
    let slice = &text[run.byte_start..run.byte_end];
    Some(
        Token::with_span(slice, run.char_start, run.char_end)
            .with_token_type(run.script.token_type()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_cover_input() {
        let text = "กิน rice 42 แล้ว!";
        let runs = scan_runs(text);

        assert_eq!(runs[0].char_start, 0);
        for pair in runs.windows(2) {
            assert_eq!(pair[0].char_end, pair[1].char_start);
            assert_eq!(pair[0].byte_end, pair[1].byte_start);
        }
        assert_eq!(runs.last().unwrap().char_end, text.chars().count());
        assert_eq!(runs.last().unwrap().byte_end, text.len());
    }

    #[test]
    fn test_script_boundaries() {
        let runs = scan_runs("ไทยabc123");
        let scripts: Vec<Script> = runs.iter().map(|r| r.script).collect();
        assert_eq!(scripts, vec![Script::Thai, Script::Latin, Script::Digit]);
    }

    #[test]
    fn test_passthrough_skips_whitespace() {
        let text = "a ข";
        let runs = scan_runs(text);
        assert_eq!(runs.len(), 3);
        assert!(passthrough_token(text, &runs[1]).is_none());

        let latin = passthrough_token(text, &runs[0]).unwrap();
        assert_eq!(latin.text, "a");
    }

    #[test]
    fn test_empty_input() {
        assert!(scan_runs("").is_empty());
    }
}
