//! Command-line interface for sealdrop.
//!
//! Key generation, recipient management, and encryption and decryption of
//! short secrets from the terminal.

pub mod args;
pub mod commands;
pub mod utils;

use crate::config::Config;
use crate::Result;
use std::process;

pub use args::Command;

/// Main entry point for the CLI application
pub fn run() -> Result<()> {
    let command = match args::parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error parsing arguments: {}", e);
            args::print_usage();
            process::exit(1);
        }
    };

    if command == Command::Help {
        args::print_usage();
        return Ok(());
    }

    let config = Config::from_env()?;
    execute(&config, command)
}

fn execute(config: &Config, command: Command) -> Result<()> {
    match command {
        Command::GenerateKey {
            user_id,
            public_key_file,
        } => {
            let password = utils::prompt_for_new_password("Enter password to protect private key")?;
            let jwk = commands::generate_key(config, &user_id, password, public_key_file.as_deref())?;
            if public_key_file.is_none() {
                println!("{}", jwk);
            }
        }
        Command::ImportKey { user_id, jwk_file } => {
            commands::import_key(config, &user_id, &jwk_file)?;
        }
        Command::ListKeys => {
            for line in commands::list_keys(config)? {
                println!("{}", line);
            }
        }
        Command::Encrypt { recipient, message } => {
            println!("{}", commands::encrypt(config, &recipient, &message)?);
        }
        Command::Decrypt {
            user_id,
            ciphertext,
        } => {
            let password = utils::prompt_for_password("Enter password for private key")?;
            println!("{}", commands::decrypt(config, &user_id, password, &ciphertext)?);
        }
        Command::ChangePassword { user_id } => {
            let old_password = utils::prompt_for_password("Current password")?;
            let new_password = utils::prompt_for_new_password("New password")?;
            commands::change_password(config, &user_id, old_password, new_password)?;
        }
        Command::Help => args::print_usage(),
    }

    Ok(())
}
