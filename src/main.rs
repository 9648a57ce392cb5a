use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = scene_visualizer::config::Config::parse();
    if cfg.list_devices {
        scene_visualizer::audio::list_input_devices()?;
        return Ok(());
    }
    if cfg.list_tracks {
        for track in scene_visualizer::tracks::DEMO_TRACKS {
            let artist = track.artist.unwrap_or("built-in");
            println!(
                "{:<14} {:<24} {} ({:.0}s)",
                track.id,
                track.title,
                artist,
                scene_visualizer::tracks::composition_seconds(track)
            );
        }
        return Ok(());
    }

    scene_visualizer::app::run(cfg)
}
