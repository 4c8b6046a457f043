use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{debug, info, warn};
use std::fs;
use svs_convert::{Args, Project, export_project, import_project, resolve_format};

fn log_summary(project: &Project) {
    info!(
        "Project '{}': {} track(s), measure prefix {}",
        project.name,
        project.tracks.len(),
        project.measure_prefix
    );
    for tempo in &project.tempos {
        info!("Tempo at tick {}: {} bpm", tempo.tick_position, tempo.bpm);
    }
    for signature in &project.time_signatures {
        info!(
            "Time signature at measure {}: {}/{}",
            signature.measure_position, signature.numerator, signature.denominator
        );
    }
    for track in &project.tracks {
        info!(
            "Track {} '{}': {} note(s), {} pitch point(s)",
            track.id,
            track.name,
            track.notes.len(),
            track.pitch.as_ref().map(|pitch| pitch.points.len()).unwrap_or(0)
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose || args.dry_run { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let from = resolve_format(args.from.as_deref(), &args.input)
        .ok_or_else(|| anyhow!("Cannot tell the format of '{}', pass --from..!", args.input.display()))?;

    let project = import_project(&args.input, Some(from))
        .with_context(|| format!("Failed to import '{}'", args.input.display()))?;

    for warning in &project.import_warnings {
        warn!("Import warning: {:?}", warning);
    }

    if args.dry_run {
        log_summary(&project);
        return Ok(());
    }
    if args.verbose {
        log_summary(&project);
    }

    let output = args
        .output
        .as_ref()
        .ok_or_else(|| anyhow!("No output path given, pass -o <path> or --dry-run..!"))?;
    let to = resolve_format(args.to.as_deref(), output)
        .ok_or_else(|| anyhow!("Cannot tell the format of '{}', pass --to..!", output.display()))?;

    let result = export_project(&project, to, &args.export_params())
        .with_context(|| format!("Failed to export as {}", to.name))?;
    for notification in &result.notifications {
        warn!("Export notification: {:?}", notification);
    }

    fs::write(output, &result.data).with_context(|| format!("Failed to write '{}'", output.display()))?;
    debug!("Wrote {} byte(s)..!", result.data.len());
    info!("Converted '{}' to '{}'..!", args.input.display(), output.display());

    Ok(())
}
