// CardTable CLI - headless solitaire sessions, dealt and driven by scripts

mod render;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cardtable_engine::codec::CodecError;
use cardtable_engine::game::Game;
use cardtable_scripting::ScriptSession;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_SCRIPT_FAULT: u8 = 1;
pub const EXIT_ARGS_ERROR: u8 = 2;
pub const EXIT_IO_ERROR: u8 = 3;
pub const EXIT_PARSE_ERROR: u8 = 4;

#[derive(Parser)]
#[command(name = "ctab")]
#[command(about = "Scriptable solitaire table (headless)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deal a fresh game and save it
    #[command(after_help = "\
Examples:
  ctab new game.json
  ctab new --seed 7 game.json")]
    New {
        /// Where to write the game file
        output: PathBuf,

        /// Deal seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print a saved game's board
    Show {
        /// Game file to render
        game: PathBuf,
    },

    /// Run a Lua automation script against a saved game
    #[command(after_help = "\
Examples:
  ctab run game.json auto.lua
  ctab run game.json auto.lua --write-back
  ctab run game.json auto.lua --restore-on-fault --write-back

The script drives the game through the fixed automation API
(waste, foundation, tableau, column, deal_cards, move, check_move,
undo, check_size, check_face_up_size, check_face_down_size,
check_exists, check_top, print). Log output goes to stdout.")]
    Run {
        /// Game file to load
        game: PathBuf,

        /// Lua script to execute
        script: PathBuf,

        /// On a fault, reload the pre-run snapshot before finishing
        #[arg(long)]
        restore_on_fault: bool,

        /// Write the resulting game state back to the game file
        #[arg(long)]
        write_back: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::New { output, seed } => cmd_new(output, seed),
        Commands::Show { game } => cmd_show(game),
        Commands::Run { game, script, restore_on_fault, write_back } => {
            cmd_run(game, script, restore_on_fault, write_back)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(err.code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO_ERROR, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE_ERROR, message: msg.into(), hint: None }
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self { code: EXIT_SCRIPT_FAULT, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn codec(err: CodecError) -> Self {
        match err {
            CodecError::Io(_) => Self::io(err.to_string()),
            CodecError::Parse(_) | CodecError::Invalid(_) => Self::parse(err.to_string()),
        }
    }
}

fn cmd_new(output: PathBuf, seed: Option<u64>) -> Result<(), CliError> {
    let seed = seed.unwrap_or_else(rand::random);
    let game = Game::deal_seeded(seed);
    game.save(&output).map_err(CliError::codec)?;
    println!("dealt game with seed {seed} -> {}", output.display());
    Ok(())
}

fn cmd_show(game: PathBuf) -> Result<(), CliError> {
    let game = Game::load(&game, false).map_err(CliError::codec)?;
    print!("{}", render::render_board(&game));
    Ok(())
}

fn cmd_run(
    game_path: PathBuf,
    script_path: PathBuf,
    restore_on_fault: bool,
    write_back: bool,
) -> Result<(), CliError> {
    let game = Game::load(&game_path, false).map_err(CliError::codec)?;
    let script = fs::read_to_string(&script_path).map_err(|err| {
        CliError::io(format!("cannot read {}: {err}", script_path.display()))
    })?;

    let mut session = ScriptSession::new(game);
    session.set_log_sink(Box::new(|line| println!("{line}")));
    session.set_script_text(script);

    let report = session.run();
    if report.error.is_some() && restore_on_fault {
        session.restore().map_err(CliError::codec)?;
        eprintln!("restored pre-run snapshot");
    }
    if write_back {
        session.game().save(&game_path).map_err(CliError::codec)?;
    }

    match report.error {
        Some(error) => Err(CliError::script(error.render())
            .with_hint("run with --restore-on-fault to replay from the pre-run state")),
        None => {
            println!("ok: {} moves accepted", report.steps);
            Ok(())
        }
    }
}
