use clap::{Parser, Subcommand};
use gif_anim::{decoder, encoder, render_frames, Animation, Image, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gif_anim")]
#[command(author, version, about = "Inspect, dump and re-encode animated GIFs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the screen descriptor and per-frame metadata
    Info {
        /// GIF file to inspect
        file: PathBuf,
    },

    /// Composite every frame and write it as frame_<n>.ppm
    Frames {
        /// GIF file to dump
        file: PathBuf,

        /// Directory for the PPM files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Decode a GIF and encode it again
    Reencode {
        /// GIF file to read
        input: PathBuf,

        /// Where to write the result
        output: PathBuf,
    },
}

fn get_ppm_representation(image: &Image) -> String {
    let header = format!("P3\n{} {}\n255\n", image.width(), image.height());
    let body = image
        .pixels()
        .iter()
        .map(|val| format!("{} {} {}", val.red, val.green, val.blue))
        .collect::<Vec<String>>()
        .join("\n");
    format!("{}{}\n", header, body)
}

fn print_info(animation: &Animation) {
    println!(
        "Logical Screen Descriptor: {:#?}",
        animation.logical_screen_descriptor
    );
    match &animation.global_quantization {
        Some(global) => println!("Global Color Table: {} colors", global.color_table().len()),
        None => println!("No Global Color Table"),
    }
    match animation.loop_count() {
        Some(0) => println!("Loops forever"),
        Some(count) => println!("Loops {} times", count),
        None => println!("Plays once"),
    }
    for (idx, frame) in animation.frames.iter().enumerate() {
        let descriptor = &frame.image_descriptor;
        println!(
            "Frame {}: {}x{} at ({}, {}), delay {}, disposal {:?}, local table: {}",
            idx,
            descriptor.width,
            descriptor.height,
            descriptor.left,
            descriptor.top,
            frame.delay_time().unwrap_or(0),
            frame.disposal_method().unwrap_or_default(),
            frame
                .local_quantization
                .as_ref()
                .map_or(0, |q| q.color_table().len())
        );
    }
}

fn write_frames(animation: &Animation, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    for (idx, image) in render_frames(animation).iter().enumerate() {
        let path = out_dir.join(format!("frame_{}.ppm", idx));
        fs::write(&path, get_ppm_representation(image))?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file } => {
            let animation = decoder::load(&file)?;
            print_info(&animation);
        }
        Commands::Frames { file, out_dir } => {
            let animation = decoder::load(&file)?;
            write_frames(&animation, &out_dir)?;
        }
        Commands::Reencode { input, output } => {
            let animation = decoder::load(&input)?;
            encoder::save(&animation, &output)?;
            log::info!(
                "Re-encoded {} frames into {}",
                animation.frames.len(),
                output.display()
            );
        }
    }
    Ok(())
}
