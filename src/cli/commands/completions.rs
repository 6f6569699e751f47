//! Shell completion generation
//!
//! Supported shells: bash, elvish, fish, powershell and zsh.
//!
//! ```bash
//! # Bash - add to ~/.bashrc
//! source <(cockpit completions bash)
//!
//! # Zsh - write into a directory on $fpath
//! cockpit completions zsh > ~/.zfunc/_cockpit
//!
//! # Fish
//! cockpit completions fish > ~/.config/fish/completions/cockpit.fish
//!
//! # PowerShell - add to $PROFILE
//! cockpit completions powershell | Out-String | Invoke-Expression
//! ```

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use miette::Result;
use std::io;

use crate::cli::Cli;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for (bash, elvish, fish, powershell, zsh)
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "cockpit", &mut io::stdout());
    Ok(())
}
