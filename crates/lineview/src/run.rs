use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use lineconfig::{AntialiasSetting, LineConfig, LineJoin};
use lineframe::{
    Antialiasing, GpuOptions, RecordingBackend, ShaderPaths, ShaderProgramManager, SourceJoin,
    SurfaceOptions,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs, WriteFragmentArgs};
use crate::shapes::ShapeKind;
use crate::window;

/// Everything the window loop needs, after config and CLI overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    pub surface: SurfaceOptions,
    pub gpu: GpuOptions,
    pub size: (u32, u32),
    pub title: String,
    pub watch: bool,
    pub shape: ShapeKind,
}

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let settings = resolve_settings(&cli.run)?;
    match cli.command {
        Some(Command::WriteFragment(args)) => write_fragment(&settings, &args),
        Some(Command::Check) => check(&settings),
        None => {
            tracing::info!(
                vertex = %settings.surface.shaders.vertex.display(),
                fragment = %settings.surface.shaders.fragment.display(),
                shape = ?settings.shape,
                "starting lineview"
            );
            window::run_window(settings)
        }
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn resolve_settings(args: &RunArgs) -> Result<Settings> {
    let config = match args.config.as_ref() {
        Some(path) => LineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LineConfig::default(),
    };

    let shape = match (args.shape, config.view.shape.as_deref()) {
        (Some(shape), _) => shape,
        (None, Some(name)) => ShapeKind::from_str(name, true)
            .map_err(|err| anyhow!("invalid view.shape '{name}': {err}"))?,
        (None, None) => ShapeKind::default(),
    };

    let vertex = args
        .vertex
        .clone()
        .unwrap_or_else(|| config.shaders.vertex.clone());
    let fragment = args
        .fragment
        .clone()
        .unwrap_or_else(|| config.shaders.fragment.clone());

    let surface = SurfaceOptions {
        shaders: ShaderPaths::new(vertex, fragment),
        line_join: map_line_join(config.shaders.line_join),
        clear_color: config.view.background,
        degrees_per_pixel: config.rotation.degrees_per_pixel,
        tick_period: config.animation.period,
        time_step: config.animation.time_step,
    };

    let antialiasing = args
        .antialias
        .or_else(|| config.view.antialias.map(map_antialias))
        .unwrap_or_default();
    let gpu = GpuOptions {
        antialiasing,
        vsync: config.view.vsync,
        ..GpuOptions::default()
    };

    Ok(Settings {
        surface,
        gpu,
        size: args
            .size
            .unwrap_or((config.window.width, config.window.height)),
        title: config.window.title,
        watch: config.shaders.watch && !args.no_watch,
        shape,
    })
}

fn map_line_join(join: LineJoin) -> SourceJoin {
    match join {
        LineJoin::Concatenate => SourceJoin::Concatenate,
        LineJoin::Newline => SourceJoin::Newline,
    }
}

fn map_antialias(setting: AntialiasSetting) -> Antialiasing {
    match setting {
        AntialiasSetting::Auto => Antialiasing::Auto,
        other => match other.samples() {
            Some(1) | None => Antialiasing::Off,
            Some(samples) => Antialiasing::Samples(samples),
        },
    }
}

fn write_fragment(settings: &Settings, args: &WriteFragmentArgs) -> Result<()> {
    let output: PathBuf = args
        .output
        .clone()
        .unwrap_or_else(|| settings.surface.shaders.fragment.clone());
    lineframe::write_generated_fragment_shader(&args.expression, &output)
        .with_context(|| format!("failed to write fragment shader {}", output.display()))?;
    tracing::info!(path = %output.display(), "wrote fragment shader");
    Ok(())
}

fn check(settings: &Settings) -> Result<()> {
    let mut backend = RecordingBackend::new();
    let mut programs =
        ShaderProgramManager::new(settings.surface.shaders.clone(), settings.surface.line_join);
    programs.initialize(&mut backend).with_context(|| {
        format!(
            "shader program {} + {} is not usable",
            settings.surface.shaders.vertex.display(),
            settings.surface.shaders.fragment.display()
        )
    })?;

    let interface = programs
        .program()
        .and_then(|program| backend.interface(program))
        .ok_or_else(|| anyhow!("shader program disappeared after initialisation"))?;

    println!("attributes:");
    for slot in interface.attributes() {
        println!("  location {} {} {}", slot.location, slot.kind, slot.name);
    }
    println!("uniforms:");
    for slot in interface.uniforms() {
        println!("  offset {:>3} {} {}", slot.offset, slot.kind, slot.name);
    }

    programs.release(&mut backend);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_without_config() {
        let settings = resolve_settings(&RunArgs::default()).unwrap();
        assert_eq!(settings.surface, SurfaceOptions::default());
        assert_eq!(settings.size, (640, 480));
        assert_eq!(settings.shape, ShapeKind::Star);
        assert!(settings.watch);
        assert_eq!(settings.gpu.antialiasing, Antialiasing::Auto);
    }

    #[test]
    fn cli_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lineview.toml");
        fs::write(
            &path,
            r#"
[shaders]
vertex = "v.glsl"
fragment = "f.glsl"
line_join = "newline"

[animation]
period = "20ms"

[view]
antialias = 8
shape = "bezier"
"#,
        )
        .unwrap();

        let args = RunArgs {
            config: Some(path),
            fragment: Some(PathBuf::from("/abs/other.glsl")),
            no_watch: true,
            antialias: Some(Antialiasing::Off),
            ..RunArgs::default()
        };
        let settings = resolve_settings(&args).unwrap();
        assert_eq!(settings.surface.shaders.vertex, dir.path().join("v.glsl"));
        assert_eq!(
            settings.surface.shaders.fragment,
            PathBuf::from("/abs/other.glsl")
        );
        assert_eq!(settings.surface.line_join, SourceJoin::Newline);
        assert_eq!(settings.surface.tick_period, Duration::from_millis(20));
        assert_eq!(settings.shape, ShapeKind::Bezier);
        assert_eq!(settings.gpu.antialiasing, Antialiasing::Off);
        assert!(!settings.watch);
    }

    #[test]
    fn config_antialias_maps_to_sample_counts() {
        assert_eq!(map_antialias(AntialiasSetting::Off), Antialiasing::Off);
        assert_eq!(
            map_antialias(AntialiasSetting::Samples4),
            Antialiasing::Samples(4)
        );
        assert_eq!(map_antialias(AntialiasSetting::Auto), Antialiasing::Auto);
    }

    #[test]
    fn unknown_config_shape_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lineview.toml");
        fs::write(&path, "[view]\nshape = \"circle\"\n").unwrap();
        let args = RunArgs {
            config: Some(path),
            ..RunArgs::default()
        };
        assert!(resolve_settings(&args).is_err());
    }
}
