use std::fs;
use std::io;
use std::path::Path;

/// Substituted for the shader text when a source file cannot be opened.
///
/// It is not valid GLSL, so the program built from it fails to compile and the
/// surface keeps running without a drawable program until the file is fixed.
pub const UNREADABLE_SOURCE: &str = "Invalid file!";

/// How the lines of a shader file are joined back together after reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceJoin {
    /// Drop every line terminator and glue the lines end to end.
    ///
    /// This is the historical behaviour. A `//` comment or a preprocessor
    /// directive swallows everything after it, so multi-line shaders using
    /// either only work with [`SourceJoin::Newline`].
    #[default]
    Concatenate,
    /// Keep one `\n` after every line.
    Newline,
}

/// Reads a shader source file, joining its lines according to `join`.
///
/// Returns [`UNREADABLE_SOURCE`] when the file cannot be opened for reading.
pub fn read_source(path: &Path, join: SourceJoin) -> String {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read shader source");
            return UNREADABLE_SOURCE.to_owned();
        }
    };

    let text = String::from_utf8_lossy(&bytes);
    let mut joined = String::with_capacity(text.len());
    for line in text.lines() {
        joined.push_str(line);
        if join == SourceJoin::Newline {
            joined.push('\n');
        }
    }
    joined
}

/// Renders the fixed fragment shader template around a colour expression.
///
/// The expression is pasted verbatim into `vec4(...)`; nothing checks that it
/// is valid GLSL.
pub fn generated_fragment_shader(color_expression: &str) -> String {
    let mut shader = String::new();
    shader.push_str("varying lowp vec4 col;\n");
    shader.push_str("void main() {\n");
    shader.push_str("    gl_FragColor = vec4(");
    shader.push_str(color_expression);
    shader.push_str(");\n");
    shader.push_str("}\n");
    shader
}

/// Writes [`generated_fragment_shader`] to `path`, replacing any existing file.
///
/// A failure is logged and handed back; the write is not retried. A broken
/// expression only shows up when the program is next rebuilt.
pub fn write_generated_fragment_shader(color_expression: &str, path: &Path) -> io::Result<()> {
    match fs::write(path, generated_fragment_shader(color_expression)) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "wrote generated fragment shader");
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                path = %path.display(),
                error = %err,
                "failed to write generated fragment shader"
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_sentinel() {
        let dir = TempDir::new().unwrap();
        let source = read_source(&dir.path().join("absent.glsl"), SourceJoin::Concatenate);
        assert_eq!(source, UNREADABLE_SOURCE);
    }

    #[test]
    fn concatenation_drops_line_breaks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shader.glsl");
        fs::write(&path, "void main() {\r\n    gl_Position = vec4(0.0);\n}\n").unwrap();

        assert_eq!(
            read_source(&path, SourceJoin::Concatenate),
            "void main() {    gl_Position = vec4(0.0);}"
        );
        assert_eq!(
            read_source(&path, SourceJoin::Newline),
            "void main() {\n    gl_Position = vec4(0.0);\n}\n"
        );
    }

    #[test]
    fn concatenation_lets_line_comments_swallow_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commented.glsl");
        fs::write(&path, "// colour pass\nvoid main() {}\n").unwrap();

        let joined = read_source(&path, SourceJoin::Concatenate);
        assert_eq!(joined, "// colour passvoid main() {}");
        assert!(joined.starts_with("//"), "the whole shader ends up inside the comment");
    }

    #[test]
    fn empty_file_reads_as_empty_string() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.glsl");
        fs::write(&path, "").unwrap();
        assert_eq!(read_source(&path, SourceJoin::Concatenate), "");
    }

    #[test]
    fn generated_shader_third_line_embeds_expression() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fragmentShader.glsl");
        write_generated_fragment_shader("1.0,0.0,0.0,1.0", &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "varying lowp vec4 col;");
        assert_eq!(lines[1], "void main() {");
        assert_eq!(lines[2], "    gl_FragColor = vec4(1.0,0.0,0.0,1.0);");
        assert_eq!(lines[3], "}");
        assert!(written.ends_with("}\n"));
    }

    #[test]
    fn generated_shader_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("fragmentShader.glsl");
        assert!(write_generated_fragment_shader("col", &path).is_err());
    }
}
