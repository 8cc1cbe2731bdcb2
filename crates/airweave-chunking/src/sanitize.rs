//! Chunk text sanitization (spec §4.3): strip control characters below
//! `0x20` (except tab/CR/LF) and Unicode noncharacters, since some
//! destinations reject them outright.

fn is_noncharacter(c: char) -> bool {
    let cp = c as u32;
    (0xFDD0..=0xFDEF).contains(&cp) || (cp & 0xFFFE) == 0xFFFE
}

pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            let cp = c as u32;
            let is_forbidden_control = cp < 0x20 && !matches!(c, '\t' | '\r' | '\n');
            !is_forbidden_control && !is_noncharacter(c)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters_but_keeps_whitespace() {
        let input = "hello\u{0007}\tworld\n\r";
        assert_eq!(sanitize_text(input), "hello\tworld\n\r");
    }

    #[test]
    fn strips_noncharacters() {
        let input = "a\u{FDD0}b\u{FFFE}c";
        assert_eq!(sanitize_text(input), "abc");
    }

    #[test]
    fn leaves_ordinary_text_untouched() {
        let input = "The quick brown fox.";
        assert_eq!(sanitize_text(input), input);
    }
}
