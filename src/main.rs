use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use hushmix::{
    analyze_quality, load_spans, read_wav, write_wav, AudioBuffer, CensorEngine, CensorStrategy,
    Config, ConfigBuilder, ConfigFile, Mixer, ProgressOperation, ReportBuilder, WavEncoding,
};

fn build_cli() -> Command {
    Command::new("hushmix")
        .about("Masks profane words in audio and remixes the result with its instrumental")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Vocal (or full mix) WAV file to censor")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("spans")
                .long("spans")
                .value_name("FILE")
                .help("JSON list of {word, start, end, confidence} spans to mask")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("instrumental")
                .short('I')
                .long("instrumental")
                .value_name("FILE")
                .help("Instrumental WAV to mix back under the censored vocals")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output WAV file (optional, defaults to input_censored.wav)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("vocals-output")
                .long("vocals-output")
                .value_name("FILE")
                .help("Also write the censored vocals before mixing")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .value_name("FILE")
                .help("Write a JSON censoring report")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("strategy")
                .short('s')
                .long("strategy")
                .value_name("STRATEGY")
                .help("Masking strategy")
                .value_parser(["mute", "tone", "reverse", "silence", "bleep", "beep"]),
        )
        .arg(
            Arg::new("fade")
                .short('f')
                .long("fade")
                .value_name("MS")
                .help("Fade duration in milliseconds")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("pre-margin")
                .long("pre-margin")
                .value_name("MS")
                .help("Extra time masked before each word, in milliseconds")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("post-margin")
                .long("post-margin")
                .value_name("MS")
                .help("Extra time masked after each word, in milliseconds")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("vocals-gain")
                .long("vocals-gain")
                .value_name("FLOAT")
                .help("Gain applied to the vocals when mixing")
                .value_parser(clap::value_parser!(f32)),
        )
        .arg(
            Arg::new("instrumental-gain")
                .long("instrumental-gain")
                .value_name("FLOAT")
                .help("Gain applied to the instrumental when mixing")
                .value_parser(clap::value_parser!(f32)),
        )
        .arg(
            Arg::new("preserve-energy")
                .long("preserve-energy")
                .help("Rebalance the mix towards the loudness of its inputs")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-compensation")
                .long("no-compensation")
                .help("Do not boost the instrumental under reversed words")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("pcm16")
                .long("pcm16")
                .help("Write 16-bit PCM instead of 32-bit float WAV")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print the sample ranges that would be masked and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (YAML/JSON)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .value_name("NAME")
                .help("Configuration profile to use (from config file)"),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .help("Disable progress indicators")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-profiles")
                .long("list-profiles")
                .help("List available configuration profiles")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-strategies")
                .long("list-strategies")
                .help("List available masking strategies")
                .action(clap::ArgAction::SetTrue),
        )
}

async fn load_config_file(matches: &ArgMatches) -> Result<Option<ConfigFile>> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => Ok(Some(
            ConfigFile::load(path)
                .await
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
        )),
        None => Ok(ConfigFile::load_from_default_locations().await),
    }
}

fn parse_config(matches: &ArgMatches, config_file: Option<&ConfigFile>) -> Result<Config> {
    let mut builder = ConfigBuilder::new();

    if let Some(cf) = config_file {
        builder = match matches.get_one::<String>("profile") {
            Some(profile_name) => cf.apply_profile_to_builder(profile_name, builder)?,
            None => cf.apply_to_builder(builder)?,
        };
    } else if let Some(profile_name) = matches.get_one::<String>("profile") {
        builder = ConfigFile::default().apply_profile_to_builder(profile_name, builder)?;
    }

    if let Some(strategy) = matches.get_one::<String>("strategy") {
        builder = builder.strategy(strategy.parse::<CensorStrategy>()?);
    }
    if let Some(&fade) = matches.get_one::<f64>("fade") {
        builder = builder.fade_ms(fade)?;
    }
    if let Some(&margin) = matches.get_one::<f64>("pre-margin") {
        builder = builder.pre_margin_ms(margin)?;
    }
    if let Some(&margin) = matches.get_one::<f64>("post-margin") {
        builder = builder.post_margin_ms(margin)?;
    }
    if let Some(&gain) = matches.get_one::<f32>("vocals-gain") {
        builder = builder.primary_gain(gain)?;
    }
    if let Some(&gain) = matches.get_one::<f32>("instrumental-gain") {
        builder = builder.companion_gain(gain)?;
    }
    if matches.get_flag("preserve-energy") {
        builder = builder.preserve_energy(true);
    }
    if matches.get_flag("no-compensation") {
        builder = builder.compensate(false);
    }

    Ok(builder.build()?)
}

fn default_output_path(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Input file has no usable name")?;
    Ok(input.with_file_name(format!("{}_censored.wav", stem)))
}

fn print_profiles(config_file: &ConfigFile) {
    println!("Available configuration profiles:");
    for name in config_file.list_profiles() {
        let description = config_file
            .profile(&name)
            .ok()
            .and_then(|p| p.description.clone())
            .unwrap_or_else(|| "No description".to_string());
        println!("  {}: {}", name, description);
    }
}

async fn write_audio(
    progress: &ProgressOperation,
    buffer: AudioBuffer,
    path: PathBuf,
    encoding: WavEncoding,
) -> Result<()> {
    let message = format!("Writing {}", path.display());
    progress
        .with_blocking(&message, move || write_wav(&buffer, &path, encoding))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if matches.get_flag("list-strategies") {
        println!("Available masking strategies:");
        for strategy in CensorStrategy::ALL {
            println!("  {}: {}", strategy, strategy.description());
        }
        return Ok(());
    }

    let config_file = load_config_file(&matches).await?;

    if matches.get_flag("list-profiles") {
        print_profiles(&config_file.clone().unwrap_or_default());
        return Ok(());
    }

    let input = matches
        .get_one::<PathBuf>("input")
        .cloned()
        .context("--input is required")?;
    let spans_path = matches
        .get_one::<PathBuf>("spans")
        .cloned()
        .context("--spans is required")?;
    let output = match matches.get_one::<PathBuf>("output") {
        Some(path) => path.clone(),
        None => default_output_path(&input)?,
    };
    let encoding = if matches.get_flag("pcm16") {
        WavEncoding::Pcm16
    } else {
        WavEncoding::Float32
    };

    let config = parse_config(&matches, config_file.as_ref())?;
    info!("Starting hushmix with config: {:?}", config);

    let engine = CensorEngine::new(config.censor.clone())?;
    let mixer = Mixer::new(config.mix.clone())?;
    let progress = ProgressOperation::new(!matches.get_flag("no-progress"));

    let spans = progress
        .with_spinner("Loading word spans", load_spans(&spans_path))
        .await
        .with_context(|| format!("Failed to load spans from {}", spans_path.display()))?;
    info!("Loaded {} spans to censor", spans.len());

    let primary = {
        let path = input.clone();
        progress
            .with_blocking("Decoding input audio", move || read_wav(&path))
            .await?
    };

    if matches.get_flag("dry-run") {
        for planned in engine.plan(&spans, primary.sample_rate(), primary.frames()) {
            println!(
                "{:>10.0}ms - {:>10.0}ms  samples {:>9}-{:<9} {}{}",
                planned.span.start_ms,
                planned.span.end_ms,
                planned.range.start,
                planned.range.end,
                planned.span.word,
                if planned.span.compressed { " (compressed)" } else { "" }
            );
        }
        return Ok(());
    }

    let companion = match matches.get_one::<PathBuf>("instrumental") {
        Some(path) => {
            let path = path.clone();
            Some(
                progress
                    .with_blocking("Decoding instrumental audio", move || read_wav(&path))
                    .await?,
            )
        }
        None => None,
    };

    if companion.is_none() && engine.strategy() == CensorStrategy::Reverse {
        warn!("Reverse strategy without an instrumental: no compensation will be applied");
    }

    let original_duration = primary.duration_secs();
    let (primary, censored) = {
        let engine = engine.clone();
        let spans = spans.clone();
        let message = format!("Applying {} censoring", engine.strategy());
        progress
            .with_blocking(&message, move || {
                engine
                    .censor_with_companion(&primary, companion.as_ref(), &spans)
                    .map(|output| (primary, output))
            })
            .await?
    };
    let stats = censored.stats;

    if let Some(path) = matches.get_one::<PathBuf>("vocals-output") {
        write_audio(&progress, censored.audio.clone(), path.clone(), encoding).await?;
    }

    let mut mix_failure = None;
    let mut mix_summary = None;
    let final_audio = match censored.companion {
        Some(companion) => {
            let vocals = censored.audio.clone();
            let mixed = progress
                .with_blocking("Mixing vocals with instrumental", move || {
                    mixer.mix(&vocals, &companion)
                })
                .await;
            match mixed {
                Ok(result) => {
                    mix_summary = Some(result.summary);
                    result.audio
                }
                Err(e) => {
                    error!("Mixing failed, writing censored vocals only: {}", e);
                    mix_failure = Some(e);
                    censored.audio
                }
            }
        }
        None => censored.audio,
    };

    let report_path = matches.get_one::<PathBuf>("report");
    let (final_audio, quality) = if report_path.is_some() {
        progress
            .with_blocking("Analyzing output quality", move || {
                let quality = match analyze_quality(&primary, &final_audio) {
                    Ok(analysis) => Some(analysis),
                    Err(e) => {
                        warn!("Quality analysis skipped: {}", e);
                        None
                    }
                };
                Ok((final_audio, quality))
            })
            .await?
    } else {
        (final_audio, None)
    };
    if let Some(ref analysis) = quality {
        info!(
            "Output quality: {} (SNR {:.1}dB vs input)",
            analysis.quality_rating, analysis.snr_db
        );
    }

    let censored_duration = final_audio.duration_secs();
    write_audio(&progress, final_audio, output.clone(), encoding).await?;

    if let Some(report_path) = report_path {
        let mut builder = ReportBuilder::new(stats.clone())
            .settings(engine.config())
            .spans(&spans)
            .source_file(&input)
            .output_file(&output)
            .durations(original_duration, censored_duration);
        if let Some(summary) = mix_summary {
            builder = builder.mix(summary);
        }
        if let Some(analysis) = quality {
            builder = builder.quality(analysis);
        }
        builder.build().save_json(report_path).await?;
    }

    info!("✓ Successfully created censored audio: {}", output.display());
    info!("Strategy used: {}", stats.strategy);
    info!(
        "Censored {} of {} spans ({:.0}ms)",
        stats.total_segments - stats.skipped_segments,
        stats.total_segments,
        stats.censored_duration_ms
    );

    if let Some(e) = mix_failure {
        return Err(e).context("Instrumental could not be mixed");
    }
    Ok(())
}
