//! Input normalization for chat-submitted snippets
//!
//! Chat transports deliver a single physical line, so users write `\n` for a
//! real newline and `\\n` for a literal backslash-n. This is the exact
//! inverse of the encoding applied by [`crate::output::reduce`].

/// Placeholder protecting escaped newlines during substitution.
const ESCAPED_NEWLINE: &str = "{//n}";

/// Apply the newline convention and ergonomic rewrites.
///
/// With `stringmode` off (input came from a file, not a chat line) the text
/// is passed through untouched apart from the shared rewrites.
pub fn prepare(input: &str, stringmode: bool) -> String {
    let mut s = input.to_string();
    if stringmode {
        s = s.replace("\\\\n", ESCAPED_NEWLINE);
        s = s.replace("\\n", "\n");
        s = s.replace(ESCAPED_NEWLINE, "\\n");
    }
    // Shorthand for print: ?(value)
    s = s.replace("?(", "print(");
    // Interpreter front ends want statement-terminated input.
    if s.contains('\n') && !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

/// Strip spaces and tabs, for the pre-filter scan and emptiness checks.
pub fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| *c != ' ' && *c != '\t').collect()
}
