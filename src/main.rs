use std::path::PathBuf;
use std::process::ExitCode;

use pianola::timing::{self, Scheduler};
use pianola::transport::{MidiIn, MidiOut, list_ports};
use pianola::ui::{TerminalControls, TerminalKeyboard};
use pianola::{PlayerConfig, PlayerError, load_timeline_from_file, logging};
use tracing::info;

enum Command {
    Help,
    ListPorts,
    Play(PathBuf),
    Live(usize),
}

#[derive(Default)]
struct Args {
    help: bool,
    list: bool,
    file: Option<PathBuf>,
    config: Option<PathBuf>,
    input_port: Option<usize>,
    output_port: Option<usize>,
}

impl Args {
    /// The input port may also come from the config file, unless a file is
    /// named on the command line.
    fn command(&self, config: &PlayerConfig) -> Result<Command, String> {
        if self.help {
            return Ok(Command::Help);
        }
        let input_port = match &self.file {
            Some(_) => self.input_port,
            None => self.input_port.or(config.input_port),
        };
        match (self.list, &self.file, input_port) {
            (true, None, _) => Ok(Command::ListPorts),
            (false, Some(path), None) => Ok(Command::Play(path.clone())),
            (false, None, Some(port)) => Ok(Command::Live(port)),
            (false, None, None) => Err("missing midi file".to_string()),
            _ => Err("a midi file, --input and --list-ports are exclusive".to_string()),
        }
    }
}

fn usage(progname: &str) -> String {
    format!(
        "Usage: {progname} [Options] <File>\n\
         \x20      {progname} [Options] --input <Port>\n\
         \n\
         Options:\n\
         \x20 -h, --help            print this help\n\
         \x20 -l, --list-ports      list the midi input and output ports\n\
         \x20 -o, --output <Port>   play on this output port (default: 0)\n\
         \x20 -i, --input <Port>    relay this input port instead of playing a file\n\
         \x20 -c, --config <File>   read settings from a RON file\n"
    )
}

fn parse_port(value: Option<String>, flag: &str) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("missing port after {flag}"))?;
    value
        .parse()
        .map_err(|_| format!("invalid port number '{value}' after {flag}"))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "-l" | "--list-ports" => parsed.list = true,
            "-o" | "--output" => parsed.output_port = Some(parse_port(args.next(), &arg)?),
            "-i" | "--input" => parsed.input_port = Some(parse_port(args.next(), &arg)?),
            "-c" | "--config" => {
                let path = args.next().ok_or("missing file after --config")?;
                parsed.config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') => return Err(format!("unknown option '{flag}'")),
            _ if parsed.file.is_some() => {
                return Err("only one midi file can be played".to_string());
            }
            path => parsed.file = Some(PathBuf::from(path)),
        }
    }
    Ok(parsed)
}

fn run(command: Command, config: &PlayerConfig) -> Result<(), PlayerError> {
    match command {
        Command::Help => Ok(()),
        Command::ListPorts => {
            let (outputs, inputs) = list_ports(&config.client_name)?;
            println!("Output ports:");
            for port in outputs {
                println!("  {}: {}", port.index, port.name);
            }
            println!("Input ports:");
            for port in inputs {
                println!("  {}: {}", port.index, port.name);
            }
            Ok(())
        }
        Command::Play(path) => {
            let timeline = load_timeline_from_file(&path)?;
            info!(
                path = %path.display(),
                moments = timeline.len(),
                duration_ns = timeline.duration(),
                "loaded song"
            );

            let output = MidiOut::open(&config.client_name, config.output_port)?;
            let display = TerminalKeyboard::new()?;
            let mut scheduler = Scheduler::new(output, display).poll_interval(config.poll_interval());
            let outcome = scheduler.play(&timeline, &mut TerminalControls);

            let (output, display) = scheduler.into_parts();
            drop(display);
            output.close();
            outcome.map(|_| ())
        }
        Command::Live(input_port) => {
            let input = MidiIn::open(&config.client_name, input_port)?;
            let output = MidiOut::open(&config.client_name, config.output_port)?;
            let display = TerminalKeyboard::new()?;
            timing::run_live(
                input,
                output,
                display,
                &mut TerminalControls,
                config.poll_interval(),
            )
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("{message}");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    let mut args = std::env::args();
    let progname = args.next().unwrap_or_else(|| "pianola".to_string());

    let args = match parse_args(args) {
        Ok(args) => args,
        Err(message) => return fail(format!("{message}\n\n{}", usage(&progname))),
    };
    if args.help {
        print!("{}", usage(&progname));
        return ExitCode::SUCCESS;
    }

    let mut config = match &args.config {
        Some(path) => match PlayerConfig::load(path) {
            Ok(config) => config,
            Err(e) => return fail(e),
        },
        None => PlayerConfig::default(),
    };
    if let Some(port) = args.output_port {
        config.output_port = port;
    }

    let command = match args.command(&config) {
        Ok(command) => command,
        Err(message) => return fail(format!("{message}\n\n{}", usage(&progname))),
    };

    if let Err(e) = logging::init(&config) {
        return fail(e);
    }

    match run(command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str], config: &PlayerConfig) -> Result<Command, String> {
        parse_args(args.iter().map(|s| s.to_string()))?.command(config)
    }

    fn parse(args: &[&str]) -> Result<Command, String> {
        command(args, &PlayerConfig::default())
    }

    #[test]
    fn test_parse_play() {
        let args = parse_args(["-o", "3", "song.mid"].iter().map(|s| s.to_string())).unwrap();
        assert_eq!(args.output_port, Some(3));
        assert!(matches!(
            args.command(&PlayerConfig::default()),
            Ok(Command::Play(ref p)) if p == &PathBuf::from("song.mid")
        ));
    }

    #[test]
    fn test_parse_live_and_list() {
        assert!(matches!(parse(&["--input", "1"]), Ok(Command::Live(1))));
        assert!(matches!(parse(&["-l"]), Ok(Command::ListPorts)));
        assert!(matches!(parse(&["x.mid", "--help"]), Ok(Command::Help)));
    }

    #[test]
    fn test_input_port_from_config() {
        let config = PlayerConfig {
            input_port: Some(2),
            ..PlayerConfig::default()
        };
        assert!(matches!(command(&[], &config), Ok(Command::Live(2))));
        assert!(matches!(command(&["-i", "5"], &config), Ok(Command::Live(5))));
        assert!(matches!(command(&["a.mid"], &config), Ok(Command::Play(_))));
    }

    #[test]
    fn test_usage_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.mid", "b.mid"]).is_err());
        assert!(parse(&["-o"]).is_err());
        assert!(parse(&["-o", "x", "a.mid"]).is_err());
        assert!(parse(&["--bogus", "a.mid"]).is_err());
        assert!(parse(&["-i", "1", "a.mid"]).is_err());
        assert!(parse(&["-l", "a.mid"]).is_err());
    }
}
