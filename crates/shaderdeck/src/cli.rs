use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "shaderdeck",
    author,
    version,
    about = "Procedural shader effects: live preview and standalone component export"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the built-in effects and their custom parameters.
    List(ListArgs),
    /// Compile, link and draw every effect on the headless context.
    Check(CheckArgs),
    /// Open a window rendering a project or effect.
    Preview(PreviewArgs),
    /// Compile a project into a standalone WebGL2 custom element.
    Export(ExportArgs),
    /// Write a starter project file.
    Init(InitArgs),
    /// Print the resolved config and data directories.
    Where,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the catalog as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Surface size used for the check frame (e.g. `640x360`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size, default_value = "640x360")]
    pub size: (u32, u32),
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Project file to load; without one a fresh session is used.
    #[arg(value_name = "PROJECT")]
    pub project: Option<PathBuf>,

    /// Select this effect instead of the project's (or the configured default).
    #[arg(long, value_name = "ID")]
    pub effect: Option<String>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Hold the clock at this many seconds instead of animating.
    #[arg(long, value_name = "SECONDS")]
    pub still_time: Option<f32>,

    /// Prefer the discrete GPU.
    #[arg(long)]
    pub high_performance: bool,

    /// Present without waiting for vertical blank.
    #[arg(long)]
    pub no_vsync: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Component class name; derived from the effect id when omitted.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Output directory (defaults to the configured export directory).
    #[arg(long, short, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Write the module to stdout instead of a file.
    #[arg(long, conflicts_with = "out")]
    pub stdout: bool,

    /// Record the generation time in the artifact banner.
    #[arg(long)]
    pub stamp: bool,

    /// Resolve layer font families from their font resource URLs first.
    #[arg(long)]
    pub fetch_fonts: bool,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the project (defaults to `<data>/projects/<effect>.toml`).
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    #[arg(long, value_name = "ID")]
    pub effect: Option<String>,

    /// Component name stored in the project.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in surface size".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in surface size".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_surface_size(" 640 X 360 "), Ok((640, 360)));
        assert_eq!(parse_surface_size("800×600"), Ok((800, 600)));
        assert!(parse_surface_size("0x10").is_err());
        assert!(parse_surface_size("wide").is_err());
    }

    #[test]
    fn export_flags_parse() {
        let cli = Cli::try_parse_from([
            "shaderdeck",
            "export",
            "demo.toml",
            "--effect",
            "vortex",
            "--name",
            "HeroBackground",
            "--stamp",
            "-o",
            "dist",
        ])
        .unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.session.project, Some(PathBuf::from("demo.toml")));
        assert_eq!(args.session.effect.as_deref(), Some("vortex"));
        assert_eq!(args.name.as_deref(), Some("HeroBackground"));
        assert_eq!(args.out, Some(PathBuf::from("dist")));
        assert!(args.stamp);
        assert!(!args.fetch_fonts);
    }

    #[test]
    fn stdout_conflicts_with_out() {
        assert!(Cli::try_parse_from(["shaderdeck", "export", "--stdout", "-o", "dist"]).is_err());
    }

    #[test]
    fn check_size_defaults() {
        let cli = Cli::try_parse_from(["shaderdeck", "check"]).unwrap();
        let Command::Check(args) = cli.command else {
            panic!("expected check command");
        };
        assert_eq!(args.size, (640, 360));
    }
}
