use log::{debug, error, info, warn};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use zcore::config::Config;
use zcore::interpreter::display::TerminalScreen;
use zcore::interpreter::input::LineInput;
use zcore::interpreter::quetzal::FileSaveStore;
use zcore::interpreter::{Game, Interpreter, RunState, VM};

struct Options {
    story: PathBuf,
    config: Option<PathBuf>,
    seed: Option<u64>,
    transcript: Option<PathBuf>,
}

fn usage(program: &str) {
    println!("zcore - Z-machine interpreter for story files (versions 1-8)");
    println!();
    println!(
        "Usage: {} <story_file> [--config path] [--seed n] [--transcript path]",
        program
    );
    println!();
    println!("  --config      read settings from a TOML file (default: ./zcore.toml if present)");
    println!("  --seed        make the random number generator reproducible");
    println!("  --transcript  write output stream 2 to a file");
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut story = None;
    let mut config = None;
    let mut seed = None;
    let mut transcript = None;

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" => {
                let path = rest.next().ok_or("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--seed" => {
                let value = rest.next().ok_or("--seed needs a number")?;
                seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid seed: {value}"))?,
                );
            }
            "--transcript" => {
                let path = rest.next().ok_or("--transcript needs a path")?;
                transcript = Some(PathBuf::from(path));
            }
            other if other.starts_with("--") => return Err(format!("Unknown option: {other}")),
            other => {
                if story.replace(PathBuf::from(other)).is_some() {
                    return Err("Only one story file may be given".to_string());
                }
            }
        }
    }

    Ok(Options {
        story: story.ok_or("No story file given")?,
        config,
        seed,
        transcript,
    })
}

/// Blocking stdin cannot interrupt a read, so timed reads simply wait for the
/// player. Says so once per session.
#[derive(Default)]
struct TimerNotice {
    shown: bool,
}

impl TimerNotice {
    /// Returns true when this call produced the notice
    fn check(&mut self, timeout: u16, routine: u16) -> bool {
        if timeout == 0 || routine == 0 || self.shown {
            return false;
        }
        warn!(
            "Timed input (every {} tenths, routine {:04x}) is not supported by this host; reads wait for the player",
            timeout, routine
        );
        self.shown = true;
        true
    }
}

fn read_story(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => format!("Story file not found: {}", path.display()),
        std::io::ErrorKind::PermissionDenied => {
            format!("Permission denied reading story file: {}", path.display())
        }
        _ => format!("Cannot read story file '{}': {e}", path.display()),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(args.first().map(String::as_str).unwrap_or("zcore"));
        return Ok(());
    }
    let options = parse_args(&args)?;

    let mut config = Config::load(options.config.as_deref())?;
    if let Some(seed) = options.seed {
        config.random_seed = Some(seed);
    }

    debug!("Loading story file: {}", options.story.display());
    let game = Game::from_memory(read_story(&options.story)?)?;
    let vm = VM::new(game)?;
    info!(
        "Story v{}, initial PC {:04x}",
        vm.version(),
        vm.game.header.initial_pc
    );

    let mut screen = TerminalScreen::new(config.screen_width as u16, config.screen_height as u16);
    if let Some(path) = &options.transcript {
        screen = screen.with_transcript(path)?;
    }
    let store = FileSaveStore::new(config.save_dir.clone());
    let mut interpreter = Interpreter::new(vm, screen, Box::new(store), config);
    if let Some(stem) = options.story.file_stem().and_then(|s| s.to_str()) {
        interpreter.set_save_name(stem);
    }

    // Piped input is not echoed by a terminal, so echo it ourselves
    let echo = !atty::is(atty::Stream::Stdin);
    let mut input = LineInput::stdin();
    let mut timer_notice = TimerNotice::default();

    loop {
        let state = match interpreter.run() {
            Ok(state) => state,
            Err(e) => {
                eprintln!("\nError during execution: {e}");
                return Err(e.into());
            }
        };
        match state {
            RunState::WaitingForLine(request) => {
                timer_notice.check(request.timeout, request.routine);
                match input.read_line()? {
                    Some(line) => {
                        if echo {
                            println!("{line}");
                        }
                        interpreter.provide_line(&line)?;
                    }
                    None => {
                        info!("End of input, leaving the story");
                        break;
                    }
                }
            }
            RunState::WaitingForChar(request) => {
                timer_notice.check(request.timeout, request.routine);
                match input.read_char()? {
                    Some(key) => interpreter.provide_char(key)?,
                    None => {
                        info!("End of input, leaving the story");
                        break;
                    }
                }
            }
            RunState::Quit => {
                debug!("Story ended normally");
                break;
            }
            RunState::Halted(message) => {
                error!("Halted: {}", message);
                return Err(message.into());
            }
            RunState::Running => {}
        }
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_story_and_options() {
        let options = parse_args(&args(&[
            "zcore",
            "--seed",
            "42",
            "zork.z5",
            "--config",
            "my.toml",
        ]))
        .unwrap();
        assert_eq!(options.story, PathBuf::from("zork.z5"));
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.config, Some(PathBuf::from("my.toml")));
        assert_eq!(options.transcript, None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["zcore", "--seed", "x", "a.z3"])).is_err());
        assert!(parse_args(&args(&["zcore", "--config"])).is_err());
        assert!(parse_args(&args(&["zcore", "a.z3", "b.z3"])).is_err());
        assert!(parse_args(&args(&["zcore", "--bogus", "a.z3"])).is_err());
        assert!(parse_args(&args(&["zcore", "--seed", "3"])).is_err());
    }

    #[test]
    fn test_timer_notice_shown_once() {
        let mut notice = TimerNotice::default();
        assert!(!notice.check(0, 0x1234));
        assert!(!notice.check(10, 0));
        assert!(notice.check(10, 0x1234));
        assert!(!notice.check(5, 0x1234));
    }
}
