use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use catalog::{EffectCatalog, EffectDefinition};
use editor::EditorSession;
use exporter::{ExportArtifact, ExportRequest};
use renderer::RendererConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckArgs, ExportArgs, InitArgs, ListArgs, PreviewArgs, SessionArgs};
use crate::config::AppConfig;
use crate::fonts::{resolve_layer_fonts, FontLoader};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Paths and configuration shared by every command.
pub struct Environment {
    pub paths: AppPaths,
    pub config: AppConfig,
}

impl Environment {
    pub fn discover() -> Result<Self> {
        let paths = AppPaths::discover()?;
        let config = AppConfig::load(&paths.config_file())?;
        tracing::debug!(
            config = %paths.config_dir().display(),
            data = %paths.data_dir().display(),
            "resolved shaderdeck paths"
        );
        Ok(Self { paths, config })
    }

    /// Loads the requested project (or a fresh session) and applies the
    /// effect override. The configured default effect only applies to fresh
    /// sessions.
    pub fn open_session(&self, args: &SessionArgs) -> Result<EditorSession> {
        let catalog = EffectCatalog::builtin().context("built-in effect catalog is invalid")?;
        let mut session = match args.project.as_deref() {
            Some(path) => EditorSession::load(catalog, path)
                .with_context(|| format!("failed to open project {}", path.display()))?,
            None => EditorSession::new(catalog),
        };
        let effect = args.effect.as_deref().or(if args.project.is_none() {
            self.config.default_effect.as_deref()
        } else {
            None
        });
        if let Some(effect) = effect {
            session
                .select_effect(effect)
                .with_context(|| format!("cannot select effect '{effect}'"))?;
        }
        Ok(session)
    }
}

pub fn list(args: ListArgs) -> Result<()> {
    let catalog = EffectCatalog::builtin().context("built-in effect catalog is invalid")?;
    if args.json {
        let definitions: Vec<&EffectDefinition> =
            catalog.list().iter().map(|definition| definition.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    println!("Effects:");
    for definition in catalog.list() {
        println!("  {:<10} {}", definition.id, definition.display_name);
        if let Some(description) = &definition.description {
            println!("             {description}");
        }
        for parameter in &definition.custom_parameters {
            println!(
                "             - {:<12} {:<16} [{}, {}] default {}",
                parameter.name, parameter.uniform_name, parameter.min, parameter.max, parameter.default
            );
        }
    }
    Ok(())
}

pub fn check(args: CheckArgs) -> Result<()> {
    let catalog = EffectCatalog::builtin().context("built-in effect catalog is invalid")?;
    let (width, height) = args.size;
    let reports = renderer::check_catalog(&catalog, width, height);

    let mut failed = 0usize;
    for (report, definition) in reports.iter().zip(catalog.list()) {
        // The preview compiles GLSL 4.50; exported artifacts need GLSL ES 3.00.
        let portability = exporter::es_portability_issues(&definition.fragment_source);
        match &report.outcome {
            Ok(()) if portability.is_empty() => println!(
                "  ok    {:<10} {} uniform bytes",
                report.id, report.uniform_bytes
            ),
            Ok(()) => {
                failed += 1;
                for issue in &portability {
                    println!("  FAIL  {:<10} {issue}", report.id);
                }
            }
            Err(err) => {
                failed += 1;
                println!("  FAIL  {:<10} {err}", report.id);
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} effect(s) failed to build", reports.len());
    }
    println!("All {} effects compiled and linked.", reports.len());
    Ok(())
}

pub fn preview(env: &Environment, args: PreviewArgs) -> Result<()> {
    let session = env.open_session(&args.session)?;
    let preview = &env.config.preview;
    let surface_size = args.size.unwrap_or((preview.width, preview.height));
    let config = RendererConfig {
        surface_size,
        title: format!(
            "shaderdeck: {}",
            session.params().selection().display_name
        ),
        power: if args.high_performance {
            renderer::GpuPowerPreference::High
        } else {
            preview.power()
        },
        present: if args.no_vsync {
            renderer::PresentPreference::Immediate
        } else {
            preview.present()
        },
        still_time: args.still_time,
    };
    tracing::info!(
        effect = %session.params().selection().id,
        width = surface_size.0,
        height = surface_size.1,
        "opening preview"
    );
    renderer::run_preview(config, session)
}

pub fn export(env: &Environment, args: ExportArgs) -> Result<()> {
    let mut session = env.open_session(&args.session)?;
    if args.name.is_some() {
        session.set_component_name(args.name.clone());
    }

    if args.fetch_fonts || env.config.export.fetch_fonts {
        let loader = FontLoader::new(env.config.fonts.timeout())?;
        let failures = resolve_layer_fonts(&mut session, |url| loader.load(url));
        for failure in &failures {
            eprintln!("warning: {failure}");
        }
    }

    let mut request = ExportRequest::from_session(&session);
    if args.stamp || env.config.export.stamp {
        request = request.with_timestamp(chrono::Utc::now());
    }
    let artifact = exporter::compile(&request).context("export failed")?;

    if args.stdout {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(artifact.text.as_bytes())
            .context("failed to write artifact to stdout")?;
        return Ok(());
    }

    let out_dir = args
        .out
        .clone()
        .or_else(|| env.config.export.directory.clone())
        .unwrap_or_else(|| env.paths.exports_dir());
    let path = write_artifact(&artifact, &out_dir)?;
    println!("Exported <{}> to {}", artifact.tag_name(), path.display());
    Ok(())
}

pub fn write_artifact(artifact: &ExportArtifact, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create export directory {}", out_dir.display()))?;
    let path = out_dir.join(artifact.file_name());
    fs::write(&path, &artifact.text)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), component = artifact.component_name(), "wrote artifact");
    Ok(path)
}

pub fn init(env: &Environment, args: InitArgs) -> Result<()> {
    let session_args = SessionArgs {
        project: None,
        effect: args.effect.clone(),
    };
    let mut session = env.open_session(&session_args)?;
    session.set_component_name(args.name.clone());

    let path = args.path.clone().unwrap_or_else(|| {
        env.paths
            .projects_dir()
            .join(format!("{}.toml", session.params().selection().id))
    });
    if path.exists() && !args.force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    session
        .persist(&path)
        .with_context(|| format!("failed to write project {}", path.display()))?;
    println!(
        "Created project {} using effect '{}'",
        path.display(),
        session.params().selection().id
    );
    Ok(())
}

pub fn describe_paths(env: &Environment) {
    println!("Configuration directories:");
    println!("  config:   {}", env.paths.config_dir().display());
    println!("  data:     {}", env.paths.data_dir().display());
    println!("  settings: {}", env.paths.config_file().display());
    println!("  projects: {}", env.paths.projects_dir().display());
    println!("  exports:  {}", env.paths.exports_dir().display());
}
