use approx::assert_abs_diff_eq;
use hushmix::{
    load_spans, read_wav, write_wav, AudioBuffer, CensorConfig, CensorEngine, CensorStrategy,
    MixConfig, Mixer, ReportBuilder, WavEncoding, WordSpan,
};
use std::path::Path;
use tempfile::tempdir;

const SAMPLE_RATE: u32 = 16000;

fn sine(frames: usize, frequency: f32, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32).sin() * amplitude
        })
        .collect()
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

async fn write_spans(path: &Path, spans: &[WordSpan]) {
    let json = serde_json::to_string(spans).unwrap();
    tokio::fs::write(path, json).await.unwrap();
}

#[tokio::test]
async fn mute_scenario_through_files() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("vocals.wav");
    let spans_path = dir.path().join("spans.json");
    let output = dir.path().join("vocals_censored.wav");

    let vocals = AudioBuffer::mono(vec![0.5; SAMPLE_RATE as usize * 10], SAMPLE_RATE).unwrap();
    write_wav(&vocals, &input, WavEncoding::Float32).unwrap();
    write_spans(&spans_path, &[WordSpan::new("heck", 2.0, 2.3, 0.95)]).await;

    let spans = load_spans(&spans_path).await.unwrap();
    let primary = read_wav(&input).unwrap();
    assert_eq!(primary, vocals);

    let engine = CensorEngine::new(CensorConfig::default()).unwrap();
    let censored = engine.censor(&primary, &spans).unwrap();
    write_wav(&censored.audio, &output, WavEncoding::Float32).unwrap();

    let written = read_wav(&output).unwrap();
    let samples = written.channel(0);

    assert_eq!(censored.stats.segments[0].start_sample, 32000);
    assert_eq!(censored.stats.segments[0].end_sample, 37200);
    assert!(samples[32000..37200].iter().all(|&s| s == 0.0));

    // 25ms fade is 400 samples on either side of the silence
    assert_eq!(samples[31600], 0.5);
    assert_eq!(samples[31999], 0.0);
    assert!(samples[31800] > 0.0 && samples[31800] < 0.5);
    assert_eq!(samples[37200], 0.0);
    assert_eq!(samples[37599], 0.5);
    assert_eq!(&samples[..31600], &vocals.channel(0)[..31600]);
    assert_eq!(&samples[37600..], &vocals.channel(0)[37600..]);
}

#[tokio::test]
async fn reverse_with_instrumental_mix_and_report() {
    let dir = tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    let frames = SAMPLE_RATE as usize * 4;

    let vocals = AudioBuffer::mono(sine(frames, 330.0, 0.8), SAMPLE_RATE).unwrap();
    let instrumental = AudioBuffer::new(
        vec![sine(frames, 110.0, 0.6), sine(frames, 110.0, 0.6)],
        SAMPLE_RATE,
    )
    .unwrap();
    let spans = vec![
        WordSpan::new("darn", 1.0, 1.4, 0.9),
        WordSpan::new("heck", 2.5, 2.8, 0.8),
    ];

    let engine = CensorEngine::new(CensorConfig {
        strategy: CensorStrategy::Reverse,
        ..Default::default()
    })
    .unwrap();
    let censored = engine
        .censor_with_companion(&vocals, Some(&instrumental), &spans)
        .unwrap();

    let boosted = censored.companion.as_ref().unwrap();
    for segment in &censored.stats.segments {
        let range = segment.start_sample..segment.end_sample;
        assert!(rms(&boosted.channel(0)[range.clone()]) > rms(&instrumental.channel(0)[range.clone()]));
        assert!(rms(&censored.audio.channel(0)[range.clone()]) < rms(&vocals.channel(0)[range]));
    }

    let mixer = Mixer::new(MixConfig::default()).unwrap();
    let mixed = mixer.mix(&censored.audio, boosted).unwrap();
    assert_eq!(mixed.audio.channel_count(), 2);
    assert_eq!(mixed.audio.frames(), frames);
    assert!(mixed.summary.limited);
    assert!(mixed.audio.peak() <= 0.95 + 1e-6);

    let report = ReportBuilder::new(censored.stats.clone())
        .settings(engine.config())
        .spans(&spans)
        .source_file("vocals.wav")
        .output_file("vocals_censored.wav")
        .durations(vocals.duration_secs(), mixed.audio.duration_secs())
        .mix(mixed.summary.clone())
        .build();
    report.save_json(&report_path).await.unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&report_path).await.unwrap()).unwrap();
    assert_eq!(value["metadata"]["strategy"], "reverse");
    assert_eq!(value["detection"]["total_words"], 2);
    assert_eq!(value["statistics"]["companion_boosted"], true);
    assert_eq!(value["mix"]["limited"], true);
    assert_abs_diff_eq!(
        value["audio_info"]["total_censored_ms"].as_f64().unwrap(),
        425.0 + 325.0,
        epsilon = 1e-6
    );
}

#[tokio::test]
async fn pcm16_output_reads_back_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let buffer = AudioBuffer::mono(sine(1600, 440.0, 0.5), SAMPLE_RATE).unwrap();

    write_wav(&buffer, &path, WavEncoding::Pcm16).unwrap();
    let decoded = read_wav(&path).unwrap();

    assert_eq!(decoded.frames(), buffer.frames());
    for (a, b) in decoded.channel(0).iter().zip(buffer.channel(0)) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
    }
}

#[tokio::test]
async fn tone_replaces_span_without_touching_neighbours() {
    let primary = AudioBuffer::mono(vec![0.25; SAMPLE_RATE as usize * 2], SAMPLE_RATE).unwrap();
    let spans = vec![WordSpan::new("shoot", 0.5, 0.75, 1.0)];
    let engine = CensorEngine::new(CensorConfig {
        strategy: CensorStrategy::Tone,
        ..Default::default()
    })
    .unwrap();

    let output = engine.censor(&primary, &spans).unwrap();
    let segment = &output.stats.segments[0];
    let masked = &output.audio.channel(0)[segment.start_sample..segment.end_sample];

    assert!(masked.iter().all(|s| s.abs() <= 0.3 + 1e-6));
    assert!(masked.iter().any(|&s| s != 0.25));
    assert_eq!(&output.audio.channel(0)[..segment.start_sample], &primary.channel(0)[..segment.start_sample]);
    assert_eq!(&output.audio.channel(0)[segment.end_sample..], &primary.channel(0)[segment.end_sample..]);
}

#[tokio::test]
async fn malformed_spans_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("spans.json");
    tokio::fs::write(&path, "{\"word\": 1}").await.unwrap();
    assert!(load_spans(&path).await.is_err());
}

#[tokio::test]
async fn reverse_mode_keeps_higher_instrumental_rate() {
    let vocals = AudioBuffer::mono(sine(SAMPLE_RATE as usize, 330.0, 0.3), SAMPLE_RATE).unwrap();
    let instrumental = AudioBuffer::mono(vec![0.2; 44100], 44100).unwrap();
    let spans = vec![WordSpan::new("darn", 0.2, 0.5, 1.0)];
    let mixer = Mixer::new(MixConfig::default()).unwrap();

    for strategy in CensorStrategy::ALL {
        let engine = CensorEngine::new(CensorConfig {
            strategy,
            ..Default::default()
        })
        .unwrap();
        let censored = engine
            .censor_with_companion(&vocals, Some(&instrumental), &spans)
            .unwrap();
        let companion = censored.companion.as_ref().unwrap();
        assert_eq!(companion.sample_rate(), 44100);

        let mixed = mixer.mix(&censored.audio, companion).unwrap();
        assert_eq!(mixed.summary.sample_rate, 44100, "strategy {}", strategy);
        assert_eq!(mixed.audio.sample_rate(), 44100);
    }
}
