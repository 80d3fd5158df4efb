//! Chat-safe output reduction

/// Reduce raw program output (or an error) to a single chat-safe line.
///
/// Line-count truncation is applied first, then per-line length truncation;
/// if neither fired and the flattened text still exceeds `max_length`, the
/// whole thing is cut with a generic marker. A `max_lines` or `max_length`
/// of zero disables the corresponding limit. Line breaks are rendered as the
/// two-character literal `\n` because the delivery channel is a single chat
/// line. Total: every input, including binary-looking text, produces output.
pub fn reduce(text: &str, is_error: bool, max_lines: usize, max_length: usize) -> String {
    if text.is_empty() {
        return "No output.".to_string();
    }

    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let mut truncated = false;

    if max_lines > 0 && lines.len() > max_lines {
        lines.truncate(max_lines);
        lines.push(format!("(...truncated at {} lines.)", max_lines));
        truncated = true;
    }

    if max_length > 0 {
        for line in &mut lines {
            if line.chars().count() > max_length {
                let cut: String = line.chars().take(max_length).collect();
                *line = format!("{} (..truncated at {} chars)", cut, max_length);
                truncated = true;
            }
        }
    }

    let mut oneliner = lines.join("\\n");
    if !truncated && max_length > 0 && oneliner.chars().count() > max_length {
        let cut: String = oneliner.chars().take(max_length).collect();
        oneliner = format!("{} (...truncated)", cut);
    }

    if is_error {
        format!("error: {}", oneliner)
    } else {
        oneliner
    }
}

/// Bound multi-line output for submission to the paste service.
///
/// Real newlines are preserved; limits below 1 are clamped to 1.
pub fn reduce_multiline(text: &str, max_lines: usize, max_length: usize) -> String {
    let max_lines = max_lines.max(1);
    let max_length = max_length.max(1);
    if text.is_empty() {
        return String::new();
    }

    let source: Vec<&str> = if text.contains('\n') {
        text.split('\n').collect()
    } else if text.contains("\\n") {
        text.split("\\n").collect()
    } else {
        vec![text]
    };

    let dropped = source.len() > max_lines;
    let mut lines: Vec<String> = source
        .into_iter()
        .take(max_lines)
        .map(|line| {
            if line.chars().count() > max_length {
                let cut: String = line.chars().take(max_length).collect();
                format!("{} ..truncated ({} chars)", cut, max_length)
            } else {
                line.to_string()
            }
        })
        .collect();
    if dropped {
        lines.push(format!("..truncated at {} lines.", max_lines));
    }

    lines.join("\n")
}
