use clap::{Parser, Subcommand};
use rhythm_trainer::midi::input::{MidiInput, list_input_ports};
use rhythm_trainer::notation::TimingClass;
use rhythm_trainer::sequencer::note::note_name;
use rhythm_trainer::{
    AudioEngine, AudioFeedback, NotationExport, SessionClock, SessionError, SessionMode,
    SessionReport, SessionRunner, Settings, SettingsStore, TimeSignature, Trainer,
    create_audio_channel, create_command_channel, create_notification_channel,
};
use ringbuf::traits::Consumer;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// Ringbuffer capacity constants
// - MIDI can theoretically send ~1000 messages/second (31250 baud)
// - The session loop drains every 25 ms, so a burst stays far below 512
// - Audio messages are clicks (one per beat) plus monitor note on/off
const MIDI_RINGBUFFER_CAPACITY: usize = 512;
const AUDIO_RINGBUFFER_CAPACITY: usize = 256;
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "rhythm_trainer")]
#[command(about = "Play along with a metronome and get your take back as rhythm notation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a practice take and print its notation
    Practice {
        /// Tempo in BPM (40-240)
        #[arg(short, long)]
        tempo: Option<f64>,

        /// Time signature, e.g. 4/4, 3/4, 6/8
        #[arg(short = 's', long)]
        time_signature: Option<TimeSignature>,

        /// Number of recorded measures
        #[arg(short, long)]
        measures: Option<u32>,

        /// MIDI input port (substring of its name)
        #[arg(short, long)]
        port: Option<String>,

        /// Write the take and its notation as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Measure input latency by playing on every beat
    Calibrate {
        /// MIDI input port (substring of its name)
        #[arg(short, long)]
        port: Option<String>,
    },

    /// List MIDI input ports
    Ports,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    println!("=== Rhythm Trainer ===");
    println!("Version {}\n", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Ports => list_ports(),
        Commands::Practice {
            tempo,
            time_signature,
            measures,
            port,
            output,
        } => practice(tempo, time_signature, measures, port, output),
        Commands::Calibrate { port } => calibrate(port),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}

fn list_ports() -> Result<(), Box<dyn Error>> {
    let ports = list_input_ports()?;
    if ports.is_empty() {
        println!("No MIDI input port found");
        return Ok(());
    }
    for port in ports {
        println!("  [{}] {}", port.index, port.name);
    }
    Ok(())
}

fn practice(
    tempo: Option<f64>,
    time_signature: Option<TimeSignature>,
    measures: Option<u32>,
    port: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let store = SettingsStore::default_location()?;
    let mut settings = store.load()?;

    // Flags apply to this run only
    if let Some(tempo) = tempo {
        settings.tempo_bpm = tempo;
    }
    if let Some(time_signature) = time_signature {
        settings.time_signature = time_signature;
    }
    if let Some(measures) = measures {
        settings.measure_count = measures;
    }
    if port.is_some() {
        settings.midi_port = port;
    }
    settings.validate()?;

    let config = settings.session_config()?;
    println!("Session: {}", config);
    println!("Latency compensation: {} ms", settings.latency_compensation_ms);
    println!("One measure of count-in, then play.\n");

    let report = run_session(settings, None, SessionMode::Practice)?;
    print_report(&report);

    if let Some(path) = output {
        let export = NotationExport::new(report.config, &report.notes, &report.notation);
        export.write_json(&path)?;
        println!("\nTake written to {}", path.display());
    }
    Ok(())
}

fn calibrate(port: Option<String>) -> Result<(), Box<dyn Error>> {
    let store = SettingsStore::default_location()?;
    let mut settings = store.load()?;
    if port.is_some() {
        settings.midi_port = port;
    }

    println!("Calibration: play one note on every beat after the count-in.\n");

    let report = run_session(settings, Some(store.clone()), SessionMode::Calibration)?;
    match report.calibration {
        Some(Ok(latency_ms)) => {
            println!("Latency compensation: {} ms", latency_ms);
            println!("Saved to {}", store.path().display());
        }
        Some(Err(e)) => println!("Calibration failed: {}", e),
        None => {}
    }
    Ok(())
}

fn run_session(
    settings: Settings,
    store: Option<SettingsStore>,
    mode: SessionMode,
) -> Result<SessionReport, Box<dyn Error>> {
    // Create the communication channels
    let (command_tx, command_rx) = create_command_channel(MIDI_RINGBUFFER_CAPACITY);
    let (audio_tx, audio_rx) = create_audio_channel(AUDIO_RINGBUFFER_CAPACITY);
    let (notification_tx, mut notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let notification_tx = Arc::new(Mutex::new(notification_tx));

    let engine = AudioEngine::new(audio_rx, notification_tx.clone(), settings.metronome_volume)?;
    println!("Audio: {} Hz", engine.sample_rate());

    let wall = SessionClock::new();
    let midi = MidiInput::connect(settings.midi_port.as_deref(), wall, command_tx)?;
    match midi.port_name() {
        Some(name) => println!("MIDI: {}", name),
        None => println!("MIDI: no input port, nothing will be recorded"),
    }

    let feedback = AudioFeedback::new(audio_tx, engine.timing());
    let mut trainer = Trainer::new(
        settings,
        Arc::new(engine.timing()),
        wall,
        Box::new(feedback),
    )
    .with_notifications(notification_tx);
    if let Some(store) = store {
        trainer = trainer.with_store(store);
    }

    let mut runner = SessionRunner::new(command_rx);
    runner.drain();

    match mode {
        SessionMode::Practice => trainer.start_session()?,
        SessionMode::Calibration => trainer.calibrate_latency()?,
    }
    let result = runner.run(&mut trainer);

    while let Some(notification) = notification_rx.try_pop() {
        println!("[{:?}] {}", notification.level, notification.message);
    }

    match result {
        Ok(report) => Ok(report),
        Err(SessionError::ClockLost(report)) => {
            eprintln!("WARNING: audio stream lost, take cut short");
            Ok(*report)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &SessionReport) {
    println!("\n{} notes recorded\n", report.notes.len());

    let mut index = 0;
    for (number, measure) in report.notation.measures().iter().enumerate() {
        let mut line = format!("{:>3} |", number + 1);
        for token in measure.iter() {
            let label = if token.is_rest() {
                "rest".to_string()
            } else {
                token
                    .pitches
                    .iter()
                    .map(|&pitch| note_name(pitch))
                    .collect::<Vec<_>>()
                    .join("+")
            };
            let timing = match report.notation.metadata[index].timing_class() {
                Some(TimingClass::OnTime) => "",
                Some(TimingClass::Early) => " (early)",
                Some(TimingClass::Late) => " (late)",
                None => "",
            };
            line.push_str(&format!(" {}:{}{}", label, token.duration_code(), timing));
            index += 1;
        }
        println!("{} |", line);
    }
}
