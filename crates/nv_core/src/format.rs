use std::path::Path;

/// Source format of a tracing file, resolved once from its file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Whitespace-delimited lines: sample, type, z, y, x, radius, parent
    Swc,
    /// JSON document with a list of neurons, each with axon and dendrite lists
    Json,
}

impl TracingFormat {
    /// `.json` (any case) selects the hierarchical parser; everything else is
    /// treated as a flat line file.
    pub fn from_file_name(name: &str) -> Self {
        Self::from_path(Path::new(name))
    }

    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => TracingFormat::Json,
            _ => TracingFormat::Swc,
        }
    }
}

/// Drop a leading UTF-8 byte-order mark.
pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(TracingFormat::from_file_name("AA0001.json"), TracingFormat::Json);
        assert_eq!(TracingFormat::from_file_name("AA0001.JSON"), TracingFormat::Json);
        assert_eq!(TracingFormat::from_file_name("AA0001.swc"), TracingFormat::Swc);
        assert_eq!(TracingFormat::from_file_name("tracing"), TracingFormat::Swc);
        assert_eq!(TracingFormat::from_file_name("json"), TracingFormat::Swc);
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{feff}1 1 0 0 0 1 -1"), "1 1 0 0 0 1 -1");
        assert_eq!(strip_bom("{}"), "{}");
        assert_eq!(strip_bom("a\u{feff}"), "a\u{feff}");
    }
}
