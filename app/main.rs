use std::{
    env::current_dir,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{error::ErrorKind, Parser, Subcommand};
use lib::{Error, MergeOutcome, Repository};

#[derive(Parser, Debug)]
#[command(name = "revlet", about = "a small local revision control system")]
struct Arguments {
    #[arg(
        short = 'C',
        long = "dir",
        global = true,
        help = "run as if started in this directory"
    )]
    dir: Option<PathBuf>,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "initialize a brand new repository")]
    Init,
    #[clap(about = "stage a file for the next commit")]
    Add { file: String },
    #[clap(about = "record the staged changes")]
    Commit { message: String },
    #[clap(about = "unstage a file, or stage its removal")]
    Rm { file: String },
    #[clap(
        about = "restore a file, or switch branches",
        long_about = "checkout -- <file> restores a file from the head commit, \
        checkout <commit> -- <file> restores it from the given commit and \
        checkout <branch> switches to a branch."
    )]
    Checkout {
        #[arg(required_unless_present = "file")]
        target: Option<String>,
        #[arg(last = true)]
        file: Option<String>,
    },
    #[clap(about = "show the history of the current branch")]
    Log,
    #[clap(name = "global-log", about = "show every commit ever made")]
    GlobalLog,
    #[clap(about = "print the ids of commits with the given message")]
    Find { message: String },
    #[clap(about = "create a branch at the current commit")]
    Branch { name: String },
    #[clap(name = "rm-branch", about = "delete a branch")]
    RmBranch { name: String },
    #[clap(about = "show branches, staged files and working directory changes")]
    Status,
    #[clap(about = "move the current branch to a commit and check it out")]
    Reset { commit: String },
    #[clap(about = "merge a branch into the current branch")]
    Merge { branch: String },
}

/// The result of one command, deciding what gets printed and how the
/// process exits.
enum Outcome {
    Success(String),
    /// Operands the command line parser could not rule out.
    Usage(&'static str),
    UserError(Error),
    Fatal(Error),
}

const INCORRECT_OPERANDS: &str = "Incorrect operands.";

impl From<lib::Result<Option<String>>> for Outcome {
    fn from(result: lib::Result<Option<String>>) -> Self {
        match result {
            Ok(Some(output)) => Outcome::Success(output),
            Ok(None) => Outcome::Usage(INCORRECT_OPERANDS),
            Err(err) if err.is_fatal() => Outcome::Fatal(err),
            Err(err) => Outcome::UserError(err),
        }
    }
}

/// Runs one command against the repository in `dir`, returning what it
/// prints, or `None` when its operands are unusable. State is flushed only
/// after the command succeeded.
fn run(cmd: Command, dir: &Path) -> lib::Result<Option<String>> {
    use Command::*;
    let mut repository = match cmd {
        Init => {
            Repository::init(dir)?;
            return Ok(Some(String::new()));
        }
        _ => Repository::open(dir)?,
    };
    let output = match cmd {
        // opening succeeded, so the directory is already a repository
        Init => return Err(Error::AlreadyInitialized),
        Add { file } => {
            repository.add(&file)?;
            String::new()
        }
        Commit { message } => {
            repository.commit(&message)?;
            String::new()
        }
        Rm { file } => {
            repository.rm(&file)?;
            String::new()
        }
        Checkout { target, file } => {
            match (target, file) {
                (None, Some(file)) => repository.checkout_file(&file)?,
                (Some(commit), Some(file)) => repository.checkout_file_in(&commit, &file)?,
                (Some(branch), None) => repository.checkout_branch(&branch)?,
                (None, None) => return Ok(None),
            }
            String::new()
        }
        Log => repository
            .log()?
            .iter()
            .map(|commit| format!("{}\n", commit))
            .collect(),
        GlobalLog => repository
            .global_log()?
            .iter()
            .map(|commit| format!("{}\n", commit))
            .collect(),
        Find { message } => repository
            .find(&message)?
            .iter()
            .map(|id| format!("{}\n", id))
            .collect(),
        Branch { name } => {
            repository.branch(&name)?;
            String::new()
        }
        RmBranch { name } => {
            repository.rm_branch(&name)?;
            String::new()
        }
        Status => repository.status()?.to_string(),
        Reset { commit } => {
            repository.reset(&commit)?;
            String::new()
        }
        Merge { branch } => match repository.merge(&branch)? {
            MergeOutcome::AlreadyMerged => {
                String::from("Given branch is an ancestor of the current branch.\n")
            }
            MergeOutcome::FastForwarded => String::from("Current branch fast-forwarded.\n"),
            MergeOutcome::Merged { conflict: true, .. } => {
                String::from("Encountered a merge conflict.\n")
            }
            MergeOutcome::Merged { conflict: false, .. } => String::new(),
        },
    };
    repository.flush()?;
    Ok(Some(output))
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match Arguments::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let message = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
                ErrorKind::MissingSubcommand
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => "Please enter a command.",
                ErrorKind::InvalidSubcommand => "No command with that name exists.",
                _ => INCORRECT_OPERANDS,
            };
            log::debug!("rejected arguments: {}", err);
            println!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let dir = match args.dir.map_or_else(current_dir, Ok) {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("cannot determine the working directory: {}", err);
            return ExitCode::FAILURE;
        }
    };
    log::info!("running {:?} in {:?}", args.cmd, dir);

    match Outcome::from(run(args.cmd, &dir)) {
        Outcome::Success(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Outcome::Usage(message) => {
            println!("{}", message);
            ExitCode::FAILURE
        }
        Outcome::UserError(err) => {
            println!("{}", err);
            ExitCode::SUCCESS
        }
        Outcome::Fatal(err) => {
            eprintln!("fatal: {}", err);
            ExitCode::FAILURE
        }
    }
}
