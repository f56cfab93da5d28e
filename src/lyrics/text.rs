//! Clean-up of downloaded lyric text
//!
//! Sources hand back whatever the provider stored. Before it reaches a file
//! the text is normalized to LF line endings without a BOM, and callers can
//! ask whether it carries LRC timestamps like `[01:02.34]`.

/// Normalize raw lyric text.
pub fn normalize(raw: &str) -> String {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Whether at least one line starts with an LRC timestamp.
pub fn is_synced(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        line.strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .is_some_and(|(tag, _)| parse_timestamp(tag).is_some())
    })
}

/// Parse `mm:ss`, `mm:ss.xx` or `mm:ss:xx` into milliseconds.
pub fn parse_timestamp(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.split([':', '.']).collect();
    let (min, sec, frac) = match parts.as_slice() {
        [m, s] => (*m, *s, None),
        [m, s, f] => (*m, *s, Some(*f)),
        _ => return None,
    };

    let min: u64 = min.parse().ok()?;
    let sec: u64 = sec.parse().ok()?;
    if sec >= 60 {
        return None;
    }
    let ms = match frac {
        None => 0,
        Some(f) => match f.len() {
            1 => f.parse::<u64>().ok()? * 100,
            2 => f.parse::<u64>().ok()? * 10,
            3 => f.parse().ok()?,
            _ => return None,
        },
    };
    Some(min * 60_000 + sec * 1000 + ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:12"), Some(12000));
        assert_eq!(parse_timestamp("01:30"), Some(90000));
        assert_eq!(parse_timestamp("00:12.34"), Some(12340));
        assert_eq!(parse_timestamp("00:12.340"), Some(12340));
        assert_eq!(parse_timestamp("00:12:34"), Some(12340));
        assert_eq!(parse_timestamp("ti:Song"), None);
        assert_eq!(parse_timestamp("00:75"), None);
    }

    #[test]
    fn test_normalize() {
        let raw = "\u{feff}[00:01.00]First  \r\n[00:02.00]Second\r\n\r\n";
        assert_eq!(normalize(raw), "[00:01.00]First\n[00:02.00]Second\n");
        assert_eq!(normalize("  \n\n"), "");
    }

    #[test]
    fn test_is_synced() {
        assert!(is_synced("[ti:Song]\n[00:12.34]Hello"));
        assert!(!is_synced("[ti:Song]\nHello\nWorld"));
        assert!(!is_synced(""));
    }
}
