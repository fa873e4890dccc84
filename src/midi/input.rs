// MIDI Input - receives device messages and hands them to the session loop
//
// The midir callback runs on its own thread. It only stamps each message with
// the session clock and pushes it; parsing happens in the session.

use crate::messaging::channels::CommandProducer;
use crate::messaging::command::SessionCommand;
use crate::midi::normalizer::RawInput;
use crate::session::runner::SessionClock;
use midir::{MidiInput as MidirInput, MidiInputConnection, MidiInputPort};
use ringbuf::traits::Producer;

const CLIENT_NAME: &str = "Rhythm Trainer MIDI Input";

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("MIDI init error: {0}")]
    Init(#[from] midir::InitError),

    #[error("No MIDI input port matches '{0}'")]
    PortNotFound(String),

    #[error("MIDI connection failed: {0}")]
    Connect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiPortInfo {
    pub index: usize,
    pub name: String,
}

/// All input ports currently visible
pub fn list_input_ports() -> Result<Vec<MidiPortInfo>, MidiError> {
    let midi_in = MidirInput::new(CLIENT_NAME)?;
    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| {
            midi_in
                .port_name(port)
                .ok()
                .map(|name| MidiPortInfo { index, name })
        })
        .collect())
}

/// First port whose name contains `pattern` (case-insensitive), or the first port
pub fn select_port<'a>(ports: &'a [MidiPortInfo], pattern: Option<&str>) -> Option<&'a MidiPortInfo> {
    match pattern {
        Some(pattern) => {
            let pattern = pattern.to_lowercase();
            ports
                .iter()
                .find(|p| p.name.to_lowercase().contains(&pattern))
        }
        None => ports.first(),
    }
}

pub struct MidiInput {
    port_name: Option<String>,
    connection: Option<MidiInputConnection<()>>,
}

impl MidiInput {
    /// Connect to the preferred port. With no port at all the trainer still
    /// runs on keyboard input, so that case is not an error.
    pub fn connect(
        preferred: Option<&str>,
        clock: SessionClock,
        mut command_tx: CommandProducer,
    ) -> Result<Self, MidiError> {
        let midi_in = MidirInput::new(CLIENT_NAME)?;
        let ports: Vec<MidiInputPort> = midi_in.ports();

        if ports.is_empty() {
            log::warn!("No MIDI port detected, continuing without MIDI");
            return Ok(Self {
                port_name: None,
                connection: None,
            });
        }

        let infos: Vec<MidiPortInfo> = ports
            .iter()
            .enumerate()
            .map(|(index, port)| MidiPortInfo {
                index,
                name: midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| "Unknown".to_string()),
            })
            .collect();

        let selected = select_port(&infos, preferred)
            .ok_or_else(|| MidiError::PortNotFound(preferred.unwrap_or_default().to_string()))?
            .clone();
        let port = &ports[selected.index];

        let connection = midi_in
            .connect(
                port,
                "rhythm-trainer-input",
                move |_timestamp, message, _| {
                    // midir timestamps use their own epoch; the session clock is what beats are predicted in
                    let command = SessionCommand::Input(RawInput::Midi {
                        bytes: message.to_vec(),
                        timestamp_ms: clock.now_ms(),
                    });

                    // try_push is not blocking
                    if command_tx.try_push(command).is_err() {
                        eprintln!("Warning: MIDI buffer full, event ignored");
                    }
                },
                (),
            )
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        log::info!("Connected to MIDI port: {}", selected.name);

        Ok(Self {
            port_name: Some(selected.name),
            connection: Some(connection),
        })
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}
