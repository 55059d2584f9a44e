//! Test binary for the classification endpoint.
//!
//! Usage: classify-test <audio_file> [base_url]

use std::env;
use std::path::Path;
use std::time::Instant;

use chirp_classify::{Classifier, HttpClassifier};
use chirp_core::{AudioClip, DEFAULT_API_URL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <audio_file> [base_url]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} clip.wav http://127.0.0.1:8000", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let base_url = args.get(2).map(String::as_str).unwrap_or(DEFAULT_API_URL);

    println!("Reading audio file: {}", path.display());
    let Some(clip) = AudioClip::from_path(path)? else {
        eprintln!("Not an audio file (unrecognized extension): {}", path.display());
        std::process::exit(1);
    };
    println!(
        "Clip: {} ({}), {} bytes ({:.2} KB)",
        clip.name(),
        clip.mime(),
        clip.len(),
        clip.len() as f64 / 1024.0
    );

    let classifier = HttpClassifier::new(base_url)?;
    println!("Posting to: {}", classifier.endpoint());

    let start = Instant::now();
    let label = classifier.classify(&clip).await?;
    let elapsed = start.elapsed();

    println!();
    println!("Classification completed in {:.2}s", elapsed.as_secs_f64());
    println!("---");
    match label {
        Some(label) => println!("{}", label),
        None => println!("(no prediction field in response)"),
    }
    println!("---");

    Ok(())
}
