use clap::Parser;
use notecast::generator::GainAutomation;
use notecast::Instrument;
use plotters::prelude::*;

const SAMPLE_RATE: f64 = 1000.0; // 1ms = 1 sample
const DISCONTINUITY_THRESHOLD: f32 = 0.15;

/// Plot one note's gain envelope as an SVG
#[derive(Parser, Debug)]
#[command(name = "plot-envelope")]
struct Args {
    /// piano, guitar, violin, flute, synth or plain
    instrument: String,
    /// Note length in seconds
    duration_secs: f64,
    /// Output SVG path
    output_path: String,
}

fn sample_envelope(gain: &GainAutomation, duration: f64) -> Vec<f32> {
    let total = (duration * SAMPLE_RATE).ceil() as usize + 1;
    (0..total)
        .map(|i| gain.value_at(i as f64 / SAMPLE_RATE))
        .collect()
}

fn check_discontinuities(samples: &[f32]) {
    let mut max_diff: f32 = 0.0;
    let mut max_diff_idx: usize = 0;

    for i in 1..samples.len() {
        let diff = (samples[i] - samples[i - 1]).abs();
        if diff > max_diff {
            max_diff = diff;
            max_diff_idx = i;
        }
    }

    if max_diff > DISCONTINUITY_THRESHOLD {
        println!(
            "  ! Jump of {:.3} at {}ms (instant onset or very short note)",
            max_diff, max_diff_idx
        );
    } else {
        println!(
            "  ✓ Max discontinuity: {:.6} at {}ms (below threshold {})",
            max_diff, max_diff_idx, DISCONTINUITY_THRESHOLD
        );
    }
}

fn create_plot(
    args: &Args,
    instrument: Instrument,
    gain: &GainAutomation,
    samples: &[f32],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(&args.output_path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_time = (samples.len().saturating_sub(1)) as f32;
    let title = format!(
        "{} ({:?}): {:.0}ms note",
        instrument,
        instrument.waveform(),
        args.duration_secs * 1000.0
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f32..max_time.max(1.0), 0f32..1.0f32)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Gain")
        .x_labels(10)
        .y_labels(10)
        .draw()?;

    chart.draw_series(LineSeries::new(
        samples.iter().enumerate().map(|(i, &s)| (i as f32, s)),
        BLUE.stroke_width(2),
    ))?;

    // Segment boundaries
    for event in gain.events() {
        chart.draw_series(std::iter::once(Circle::new(
            ((event.time * SAMPLE_RATE) as f32, event.value),
            4,
            RED.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if !(args.duration_secs > 0.0 && args.duration_secs.is_finite()) {
        return Err("Duration must be a positive number of seconds".into());
    }

    let instrument = Instrument::from_name(&args.instrument);
    let mut gain = GainAutomation::new(0.0);
    instrument.shape_envelope(&mut gain, 0.0, args.duration_secs);

    println!("Envelope Plot Generator");
    println!("=======================");
    println!("  Instrument: {}", instrument);
    println!("  Duration: {}s", args.duration_secs);
    for event in gain.events() {
        println!(
            "  {:>8.1}ms  {:?} -> {:.3}",
            event.time * 1000.0,
            event.kind,
            event.value
        );
    }
    println!();

    let samples = sample_envelope(&gain, args.duration_secs);
    check_discontinuities(&samples);

    print!("  Creating plot... ");
    create_plot(&args, instrument, &gain, &samples)?;
    println!("done");

    println!();
    println!("Output: {}", args.output_path);

    Ok(())
}
