//! retempo command-line tool
//!
//! Changes tempo and pitch of WAV files, or wraps raw PCM in a WAV header.

use clap::{Parser, Subcommand};
use retempo::export::WavHeader;
use retempo::prelude::*;
use retempo::{parse_percent_change, version_string, ResampleQuality};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

/// retempo - change tempo and pitch of PCM audio
#[derive(Parser)]
#[command(name = "retempo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Tempo, pitch and rate shared by the processing commands.
#[derive(clap::Args, Debug, Clone, Copy)]
struct Effect {
    /// Tempo change as a percentage, e.g. +20% or -50
    #[arg(long, default_value = "0%", value_parser = percent, allow_hyphen_values = true)]
    tempo: f32,

    /// Pitch change in semitones
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pitch: f32,

    /// Playback rate change as a percentage (tempo and pitch together)
    #[arg(long, default_value = "0%", value_parser = percent, allow_hyphen_values = true)]
    rate: f32,

    /// Bytes read per chunk
    #[arg(long, default_value_t = 8192)]
    chunk: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a WAV file into a new WAV file
    Process {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        #[command(flatten)]
        effect: Effect,

        /// Resample the result to this rate (Hz)
        #[arg(long)]
        output_rate: Option<u32>,
    },

    /// Two-step flow: stream raw PCM to a temp file, then wrap it
    Raw {
        /// Input WAV file with a canonical 44-byte header
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Where to put the intermediate raw PCM
        #[arg(long)]
        raw_temp: PathBuf,

        #[command(flatten)]
        effect: Effect,
    },

    /// Wrap a headerless PCM file in a WAV header
    Wrap {
        /// Raw PCM input
        raw: PathBuf,

        /// WAV output
        wav: PathBuf,

        #[arg(long)]
        sample_rate: u32,

        #[arg(long, default_value_t = 1)]
        channels: u16,

        #[arg(long, default_value_t = 16)]
        bits: u16,
    },

    /// Print the library version
    Version,
}

fn percent(text: &str) -> std::result::Result<f32, String> {
    parse_percent_change(text).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let started = Instant::now();

    let result = match cli.command {
        Commands::Version => {
            println!("{}", version_string());
            return ExitCode::SUCCESS;
        }
        Commands::Process {
            input,
            output,
            effect,
            output_rate,
        } => process(input, output, effect, output_rate),
        Commands::Raw {
            input,
            output,
            raw_temp,
            effect,
        } => raw(input, output, raw_temp, effect),
        Commands::Wrap {
            raw,
            wav,
            sample_rate,
            channels,
            bits,
        } => wrap(raw, wav, sample_rate, channels, bits),
    };

    match result {
        Ok(()) => {
            println!(
                "Processing took {:.3} s",
                started.elapsed().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failure: {e}");
            ExitCode::from(1)
        }
    }
}

fn process(
    input: PathBuf,
    output: PathBuf,
    effect: Effect,
    output_rate: Option<u32>,
) -> Result<()> {
    println!("{}", version_string());
    let mut builder = ProcessBuilder::new(&input, &output)
        .tempo(effect.tempo)
        .pitch_semitones(effect.pitch)
        .rate(effect.rate)
        .chunk_size_bytes(effect.chunk)
        .resample_quality(ResampleQuality::High);
    if let Some(hz) = output_rate {
        builder = builder.output_sample_rate(hz);
    }
    let report = builder.run()?;
    println!(
        "{} -> {}: {} bytes in, {} bytes out",
        input.display(),
        output.display(),
        report.bytes_read,
        report.bytes_written
    );
    Ok(())
}

fn raw(input: PathBuf, output: PathBuf, raw_temp: PathBuf, effect: Effect) -> Result<()> {
    println!("{}", version_string());

    let mut source = BufReader::new(File::open(&input)?);
    let mut header = [0u8; retempo::export::WAV_HEADER_LEN];
    source.read_exact(&mut header)?;
    let format = WavHeader::parse(&header)?.format;

    let config = SessionConfig::for_format(&format)
        .tempo(effect.tempo)
        .pitch_semitones(effect.pitch)
        .rate(effect.rate);
    // The header has already been consumed from `source`.
    let options = DriverOptions::default()
        .chunk_size_bytes(effect.chunk)
        .sample_format(format.sample_format);
    let mut driver = StreamDriver::new(config, options)?;

    let mut sink = WriterSink::new(BufWriter::new(File::create(&raw_temp)?));
    let report = driver.process_stream(source, &mut sink)?;
    sink.into_inner()?;

    pcm_to_wav(
        &raw_temp,
        &output,
        format.sample_rate,
        format.layout,
        format.bits_per_sample(),
    )?;
    println!(
        "{} -> {}: {} bytes in, {} bytes out",
        input.display(),
        output.display(),
        report.bytes_read,
        report.bytes_written
    );
    Ok(())
}

fn wrap(raw: PathBuf, wav: PathBuf, sample_rate: u32, channels: u16, bits: u16) -> Result<()> {
    let layout = ChannelLayout::from_count(channels)?;
    let bytes = pcm_to_wav(&raw, &wav, sample_rate, layout, bits)?;
    println!("{}: {} bytes of PCM", wav.display(), bytes);
    Ok(())
}
