//! Command-line argument parsing for sealdrop.

use crate::error::{Result, SealdropError};
use std::env;
use std::path::PathBuf;

/// Command-line interface commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GenerateKey {
        user_id: String,
        public_key_file: Option<PathBuf>,
    },
    ImportKey {
        user_id: String,
        jwk_file: PathBuf,
    },
    ListKeys,
    Encrypt {
        recipient: String,
        message: String,
    },
    Decrypt {
        user_id: String,
        ciphertext: String,
    },
    ChangePassword {
        user_id: String,
    },
    Help,
}

/// Parse the process arguments into a Command
pub fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_from(&args)
}

/// Parse arguments (without the program name) into a Command
pub fn parse_from(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };

    let arg = |index: usize, what: &str| -> Result<String> {
        args.get(index).cloned().ok_or_else(|| {
            SealdropError::validation(format!("{} requires {}", command, what))
        })
    };

    let command = match command.as_str() {
        "generate-key" => Command::GenerateKey {
            user_id: arg(1, "a user ID")?,
            public_key_file: args.get(2).map(PathBuf::from),
        },
        "import-key" => Command::ImportKey {
            user_id: arg(1, "a user ID and a JWK file")?,
            jwk_file: PathBuf::from(arg(2, "a user ID and a JWK file")?),
        },
        "list-keys" => Command::ListKeys,
        "encrypt" => Command::Encrypt {
            recipient: arg(1, "a recipient and a message")?,
            message: arg(2, "a recipient and a message")?,
        },
        "decrypt" => Command::Decrypt {
            user_id: arg(1, "a user ID and a ciphertext")?,
            ciphertext: arg(2, "a user ID and a ciphertext")?,
        },
        "change-password" => Command::ChangePassword {
            user_id: arg(1, "a user ID")?,
        },
        "help" | "--help" | "-h" => Command::Help,
        other => {
            return Err(SealdropError::validation(format!(
                "Unknown command '{}'",
                other
            )))
        }
    };

    Ok(command)
}

/// Print usage information
pub fn print_usage() {
    println!("sealdrop - end-to-end encrypted secret sharing");
    println!();
    println!("Usage: sealdrop <command> [args...]");
    println!();
    println!("Commands:");
    println!("  generate-key <user_id> [public_key_file]  Create and store a password-protected key pair");
    println!("  import-key <user_id> <jwk_file>           Add a recipient's published public key");
    println!("  list-keys                                 List recipients in the public keyring");
    println!("  encrypt <recipient> <message>             Encrypt a short secret for a recipient");
    println!("  decrypt <user_id> <ciphertext>            Decrypt a secret with your stored key");
    println!("  change-password <user_id>                 Re-protect your stored key");
    println!();
    println!("Environment:");
    println!("  SEALDROP_HOME               Storage directory (default: ~/.sealdrop)");
    println!("  SEALDROP_KDF                pbkdf2 | argon2id");
    println!("  SEALDROP_PBKDF2_ITERATIONS  PBKDF2 iteration count (minimum 100000)");
    println!();
    println!("Examples:");
    println!("  sealdrop generate-key alice@example.com alice.jwk");
    println!("  sealdrop import-key bob@example.com bob.jwk");
    println!("  sealdrop encrypt bob@example.com 'launch codes: 04-15'");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_from(&[]).unwrap(), Command::Help);
        assert_eq!(
            parse_from(&args(&["generate-key", "alice"])).unwrap(),
            Command::GenerateKey {
                user_id: "alice".into(),
                public_key_file: None
            }
        );
        assert_eq!(
            parse_from(&args(&["generate-key", "alice", "alice.jwk"])).unwrap(),
            Command::GenerateKey {
                user_id: "alice".into(),
                public_key_file: Some(PathBuf::from("alice.jwk"))
            }
        );
        assert_eq!(
            parse_from(&args(&["encrypt", "bob", "hi there"])).unwrap(),
            Command::Encrypt {
                recipient: "bob".into(),
                message: "hi there".into()
            }
        );
        assert_eq!(
            parse_from(&args(&["list-keys"])).unwrap(),
            Command::ListKeys
        );
    }

    #[test]
    fn test_missing_arguments() {
        for list in [
            &["generate-key"][..],
            &["import-key", "bob"],
            &["encrypt", "bob"],
            &["decrypt"],
            &["change-password"],
        ] {
            assert!(matches!(
                parse_from(&args(list)),
                Err(SealdropError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_from(&args(&["sign", "file"])).is_err());
    }
}
