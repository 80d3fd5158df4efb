//! Forbidden-substring pre-filter
//!
//! A best-effort convenience check, not the safety boundary; the isolated
//! worker is what actually contains hostile code. Matching happens against
//! whitespace-stripped input so `e v a l (` offers no way around it.

/// Forbidden substrings and the message returned for each.
pub const FORBIDDEN: &[(&str, &str)] = &[
    ("__bases__", "too complicated for this bot."),
    ("__import__", "no __import__ allowed."),
    ("__subclasses__", "too complicated for this bot."),
    ("builtin", "no builtins allowed."),
    ("eval(", "no eval() allowed."),
    ("exec(", "no exec() allowed."),
    ("exit", "no exit allowed."),
    ("help(", "no help() allowed."),
    ("import", "no imports allowed."),
    ("KABOOM", "no way."),
    ("kaboom", "no way."),
    ("open", "no open() allowed."),
    ("os.", "no os module allowed."),
    ("self", "no self allowed."),
    ("super", "no super() allowed."),
    ("sys", "no sys allowed."),
    ("SystemExit", "no SystemExit allowed."),
];

/// Scan whitespace-stripped input; returns the mapped message on a match.
pub fn find(stripped: &str) -> Option<&'static str> {
    FORBIDDEN
        .iter()
        .find(|(pattern, _)| stripped.contains(pattern))
        .map(|(_, message)| *message)
}
