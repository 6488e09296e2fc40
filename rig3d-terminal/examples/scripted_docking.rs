/// Example: drive the transformer headlessly and print the docking sequence
///
/// Usage: cargo run -p rig3d-terminal --example scripted_docking

use anyhow::Result;
use rig3d_core::{presets, AnimatorEvent};

const FRAME: f32 = 1.0 / 30.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("rig3d_core=info"))
        .init();

    let mut sim = presets::transformer()?;
    sim.press("transform-close")?;
    sim.press("trailer-back")?;

    for frame in 0..300 {
        let report = sim.tick(FRAME)?;
        for event in &report.events {
            println!("frame {frame:3}: {event:?}");
        }
        if report.events.contains(&AnimatorEvent::DockingComplete) {
            let trailer = sim.payload().map(|p| p.world_transform(p.root())).transpose()?;
            if let Some(transform) = trailer {
                println!("trailer hitched at {:?}", transform.translation);
            }
            return Ok(());
        }
    }

    println!("trailer never docked");
    Ok(())
}
