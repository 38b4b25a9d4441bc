fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_line(code: &str, stage: &str, action: &str, subject: &str, reason: &str) -> String {
    format!(
        "SQL2ES_WARN code={} stage={} action={} subject={} reason={}",
        sanitize_value(code),
        sanitize_value(stage),
        sanitize_value(action),
        sanitize_value(subject),
        sanitize_value(reason),
    )
}

/// Log a recovered condition as a single greppable key=value line.
pub fn emit(code: &str, stage: &str, action: &str, subject: &str, reason: &str) {
    log::warn!("{}", format_line(code, stage, action, subject, reason));
}
