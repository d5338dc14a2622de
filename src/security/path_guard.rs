/// Replace path separators, shell-hostile characters and control characters
/// so the result can never escape the upload directory.
pub fn sanitize_filename(name: &str) -> String {
    let dangerous_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

    let sanitized: String = name
        .chars()
        .map(|c| {
            if dangerous_chars.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = sanitized.trim_matches(|c| c == '.' || c == ' ');

    if sanitized.is_empty() {
        return "unnamed".to_string();
    }

    let reserved = [
        "CON", "PRN", "AUX", "NUL",
        "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
        "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    let upper = sanitized.to_uppercase();
    let base_name = upper.split('.').next().unwrap_or("");
    if reserved.contains(&base_name) {
        return format!("_{}", sanitized);
    }

    if sanitized.len() > 255 {
        sanitized[..255].to_string()
    } else {
        sanitized.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("normal.txt"), "normal.txt");
        assert_eq!(sanitize_filename("file/with\\slashes"), "file_with_slashes");
        assert_eq!(sanitize_filename("file:name"), "file_name");
        assert_eq!(sanitize_filename("..."), "unnamed");
        assert_eq!(sanitize_filename("   "), "unnamed");
        assert_eq!(sanitize_filename("CON"), "_CON");
        assert_eq!(sanitize_filename("CON.txt"), "_CON.txt");
    }

    #[test]
    fn test_sanitize_strips_traversal() {
        let safe = sanitize_filename("../../etc/passwd");
        assert!(!safe.contains('/'));
        assert_eq!(safe, "_.._etc_passwd");

        assert_eq!(sanitize_filename(".."), "unnamed");
        assert!(!sanitize_filename("..\\..\\boot.ini").contains('\\'));
    }

    #[test]
    fn test_sanitize_filename_long() {
        let long = "a".repeat(300);
        assert_eq!(sanitize_filename(&long).len(), 255);
    }

    #[test]
    fn test_sanitize_control_chars() {
        assert_eq!(sanitize_filename("re\nport.pdf"), "re_port.pdf");
        assert_eq!(sanitize_filename("re\0port.pdf"), "re_port.pdf");
    }
}
