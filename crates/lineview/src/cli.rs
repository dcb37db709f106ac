use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lineframe::Antialiasing;

use crate::shapes::ShapeKind;

#[derive(Parser, Debug)]
#[command(
    name = "lineview",
    author,
    version,
    about = "Interactive viewer for hot-reloaded GLSL line shaders"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// TOML configuration file; CLI flags override its values.
    #[arg(long, global = true, value_name = "PATH", env = "LINEVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Vertex shader source (default `vertexShader.glsl`).
    #[arg(long, global = true, value_name = "PATH")]
    pub vertex: Option<PathBuf>,

    /// Fragment shader source (default `fragmentShader.glsl`).
    #[arg(long, global = true, value_name = "PATH")]
    pub fragment: Option<PathBuf>,

    /// Initial window size (e.g. `800x600`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Built-in shape to draw.
    #[arg(long, value_enum, value_name = "NAME")]
    pub shape: Option<ShapeKind>,

    /// Do not reload shaders when their files change.
    #[arg(long)]
    pub no_watch: bool,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a fragment shader that paints every line with a constant colour expression.
    WriteFragment(WriteFragmentArgs),
    /// Build the shader program without a window and print its interface.
    Check,
}

#[derive(Parser, Debug)]
pub struct WriteFragmentArgs {
    /// Arguments of the generated `vec4(...)`, e.g. `1.0, 0.5, 0.0, 1.0` or `col`.
    #[arg(value_name = "EXPR", allow_hyphen_values = true)]
    pub expression: String,

    /// Destination file; defaults to the configured fragment shader.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{value}'; expected WIDTHxHEIGHT"))?;
    let parse = |raw: &str| {
        raw.trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid size '{value}'; expected WIDTHxHEIGHT"))
    };
    let size = (parse(width)?, parse(height)?);
    if size.0 == 0 || size.1 == 0 {
        return Err("window size must be non-zero".to_string());
    }
    Ok(size)
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    trimmed.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window_size() {
        assert_eq!(parse_size("800x600"), Ok((800, 600)));
        assert_eq!(parse_size(" 1024X768 "), Ok((1024, 768)));
        assert!(parse_size("800").is_err());
        assert!(parse_size("0x600").is_err());
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "lineview",
            "--vertex",
            "v.glsl",
            "--shape",
            "star",
            "--no-watch",
            "--antialias",
            "off",
        ])
        .unwrap();
        assert_eq!(cli.run.vertex, Some(PathBuf::from("v.glsl")));
        assert_eq!(cli.run.shape, Some(ShapeKind::Star));
        assert!(cli.run.no_watch);
        assert_eq!(cli.run.antialias, Some(Antialiasing::Off));
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_write_fragment() {
        let cli = Cli::try_parse_from([
            "lineview",
            "write-fragment",
            "1.0, 0.0, 0.0, 1.0",
            "--output",
            "out.glsl",
        ])
        .unwrap();
        match cli.command {
            Some(Command::WriteFragment(args)) => {
                assert_eq!(args.expression, "1.0, 0.0, 0.0, 1.0");
                assert_eq!(args.output, Some(PathBuf::from("out.glsl")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn shader_paths_reach_subcommands() {
        let cli = Cli::try_parse_from(["lineview", "check", "--fragment", "f.glsl"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Check)));
        assert_eq!(cli.run.fragment, Some(PathBuf::from("f.glsl")));
    }
}
