//! Splitting of multi-statement SQL scripts.

/// Split a script into statements.
///
/// Carriage returns become newlines, `/* .. */` and `-- ..` comments are removed and the text is
/// split on `;`. Comment markers and semicolons inside quoted strings (`'..'`, `".."`, with
/// backslash escapes) are left alone. Blank statements are dropped; the rest keep their
/// surrounding whitespace.
pub fn split_statements(script: &str) -> Vec<String> {
    let script = script.replace('\r', "\n");
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = script.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            ';' => statements.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    statements.push(current);

    statements
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}
