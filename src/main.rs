use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sori::voice::{AudioArtifact, Player, Recorder, TextToSpeech, rms_energy};
use sori::{Session, Settings};

/// Sori - voice-driven Korean conversational assistant
#[derive(Parser)]
#[command(name = "sori", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test speech synthesis and playback
    TestTts {
        /// Text to speak
        #[arg(default_value = "안녕하세요. 음성 합성 테스트입니다.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,sori=info",
        1 => "info,sori=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&text).await,
        };
    }

    let settings = Settings::load();
    tracing::debug!(?settings, "loaded settings");

    let session = Session::new(settings)?;
    tracing::info!("sori ready - say an exit phrase (\"종료\") to stop");

    session.run().await?;

    Ok(())
}

/// Test microphone input with a live level meter
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut recorder = Recorder::new()?;
    recorder.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = recorder.take_buffer();
        let energy = rms_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    recorder.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working.");
    println!("If RMS stayed near 0, check your input device and levels.");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let player = Player::new()?;

    // 2 seconds of 440Hz sine at the playback rate
    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let num_samples = (sample_rate * 2) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    player.play_samples(samples)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working.");

    Ok(())
}

/// Test speech synthesis end to end: synthesize, write artifact, play
#[allow(clippy::future_not_send)]
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let settings = Settings::load();
    let tts = TextToSpeech::new(&settings.tts_host, &settings.tts_language)?;

    println!("Synthesizing speech...");
    let mp3 = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3.len());

    let mut artifact = AudioArtifact::write(&mp3)?;
    println!("Playing {}...", artifact.path().display());

    let player = Player::new()?;
    let played = player.play_file(artifact.path());
    artifact.delete();
    played?;

    println!("\n---");
    println!("If you heard the speech, TTS is working.");

    Ok(())
}
