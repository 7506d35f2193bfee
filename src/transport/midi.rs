use midir::{MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection};
use tracing::info;

use super::{InputTransport, Transport};
use crate::error::{PlayerError, Result};

fn transport_error(context: &str, err: impl std::fmt::Display) -> PlayerError {
    PlayerError::Transport(format!("{context}: {err}"))
}

/// An open MIDI output port.
pub struct MidiOut {
    connection: MidiOutputConnection,
    name: String,
}

impl MidiOut {
    pub fn open(client_name: &str, port_index: usize) -> Result<Self> {
        let output = MidiOutput::new(client_name)
            .map_err(|e| transport_error("couldn't create midi output", e))?;

        let ports = output.ports();
        let port = ports.get(port_index).ok_or(PlayerError::PortNotFound {
            direction: "output",
            index: port_index,
        })?;
        let name = output
            .port_name(port)
            .unwrap_or_else(|_| format!("Output {port_index}"));

        let connection = output
            .connect(port, &format!("{client_name}-output"))
            .map_err(|e| transport_error("couldn't open output sound port", e))?;

        info!(port = port_index, name = %name, "opened midi output");
        Ok(Self { connection, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn close(self) {
        info!(name = %self.name, "closing midi output");
        self.connection.close();
    }
}

impl Transport for MidiOut {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| transport_error("couldn't send midi message", e))
    }
}

/// A MIDI input port, not yet listening.
pub struct MidiIn {
    input: MidiInput,
    port: MidiInputPort,
    name: String,
    client_name: String,
}

impl MidiIn {
    pub fn open(client_name: &str, port_index: usize) -> Result<Self> {
        let input = MidiInput::new(client_name)
            .map_err(|e| transport_error("couldn't create midi input", e))?;

        let port = input
            .ports()
            .get(port_index)
            .cloned()
            .ok_or(PlayerError::PortNotFound {
                direction: "input",
                index: port_index,
            })?;
        let name = input
            .port_name(&port)
            .unwrap_or_else(|_| format!("Input {port_index}"));

        Ok(Self {
            input,
            port,
            name,
            client_name: client_name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl InputTransport for MidiIn {
    type Connection = MidiInputConnection<()>;

    fn register_callback<F>(self, mut callback: F) -> Result<Self::Connection>
    where
        F: FnMut(u64, &[u8]) + Send + 'static,
    {
        let connection = self
            .input
            .connect(
                &self.port,
                &format!("{}-input", self.client_name),
                move |timestamp, message, _| callback(timestamp, message),
                (),
            )
            .map_err(|e| transport_error("couldn't open input sound port", e))?;

        info!(name = %self.name, "listening to midi input");
        Ok(connection)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
}

/// Output and input ports currently available.
pub fn list_ports(client_name: &str) -> Result<(Vec<PortInfo>, Vec<PortInfo>)> {
    let output = MidiOutput::new(client_name)
        .map_err(|e| transport_error("couldn't create midi output", e))?;
    let outputs = output
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| PortInfo {
            index,
            name: output
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {index}")),
        })
        .collect();

    let input = MidiInput::new(client_name)
        .map_err(|e| transport_error("couldn't create midi input", e))?;
    let inputs = input
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| PortInfo {
            index,
            name: input
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {index}")),
        })
        .collect();

    Ok((outputs, inputs))
}
