use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use tracing_subscriber::EnvFilter;

use edge_agent::tools::{self, PlaySound};
use edge_agent::voice::{
    AudioCapture, MicrophoneCapture, MicrophoneRecorder, SpeakerSink, WhisperTranscriber,
};
use edge_agent::{ChatClassifier, CommandRouter, Config, Tool};

/// edge-agent - Voice and text command router for edge devices
#[derive(Parser)]
#[command(name = "edge-agent", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Route one typed command and exit
    Text {
        /// Command text
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Record and route one spoken command
    Voice,
    /// Print the tool catalog sent to the classifier
    Tools,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "info",
            1 => "info,edge_agent=debug",
            2 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

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
    match cli.command {
        Some(Command::TestMic { duration }) => return test_mic(duration).await,
        Some(Command::TestSpeaker) => return test_speaker().await,
        _ => {}
    }

    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");
    config.ensure_dirs()?;

    let router = build_router(&config)?;

    match cli.command {
        Some(Command::Text { words }) => {
            println!("{}", router.process_text_command(&words.join(" ")).await);
        }
        Some(Command::Voice) => {
            println!("{}", router.process_voice_command().await);
        }
        Some(Command::Tools) => {
            println!("{}", serde_json::to_string_pretty(&router.registry().snapshot())?);
        }
        Some(Command::TestMic { .. } | Command::TestSpeaker) => {}
        None => interactive(&router).await?,
    }

    Ok(())
}

/// Wire the registry, classifier and microphone into a router
fn build_router(config: &Config) -> anyhow::Result<CommandRouter> {
    let registry = tools::builtin_registry(config)?;
    let classifier = ChatClassifier::new(&config.llm)?;

    let capture = MicrophoneCapture::new(
        Arc::new(MicrophoneRecorder::new(config.audio.sample_rate)),
        Arc::new(WhisperTranscriber::new(&config.stt)?),
        config.audio.record_duration,
    )
    .with_output_dir(config.audio.output_dir.clone());

    tracing::info!(
        tools = registry.len(),
        model = %classifier.model(),
        "edge-agent ready"
    );

    Ok(CommandRouter::new(Arc::new(registry), Arc::new(classifier))
        .with_voice_capture(Arc::new(capture)))
}

/// Menu loop: voice input, text input or quit
async fn interactive(router: &CommandRouter) -> anyhow::Result<()> {
    let choices = ["Voice input", "Text input", "Quit"];

    loop {
        let choice = Select::new()
            .with_prompt("Choose input mode")
            .items(&choices)
            .default(1)
            .interact()?;

        let reply = match choice {
            0 => {
                println!("Listening...");
                router.process_voice_command().await
            }
            1 => {
                let text: String = Input::new()
                    .with_prompt("Command")
                    .allow_empty(true)
                    .interact_text()?;
                router.process_text_command(&text).await
            }
            _ => return Ok(()),
        };

        println!("{reply}\n");
    }
}

/// Test microphone input with a live level meter
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new(edge_agent::config::DEFAULT_SAMPLE_RATE)?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: arecord -l (to list devices)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let tone = PlaySound::new(Arc::new(SpeakerSink), edge_agent::config::DEFAULT_SAMPLE_RATE)
        .with_tone(440.0, 2.0);
    println!("{}", tone.execute().await?);

    Ok(())
}
