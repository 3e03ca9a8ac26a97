use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "notekeep", version, about = "Sign in to notekeep and call its API")]
pub struct Cli {
    /// API origin, e.g. https://keep.example.com/api
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Where to keep the session (defaults to the configured backend)
    #[arg(long, value_enum, global = true)]
    pub store: Option<StoreArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign in with the text of a scanned login QR code
    QrLogin {
        /// Scanned text, e.g. https://host/auth/qr-login?code=...
        text: String,
    },

    /// Sign out and remove stored credentials
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Send an authenticated request and print the JSON payload
    Request {
        /// Endpoint relative to the API origin, e.g. notes or tasks/3/toggle
        endpoint: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// JSON body for POST, PUT and PATCH
        #[arg(short = 'd', long)]
        data: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreArg {
    Keyring,
    EncryptedFile,
    Memory,
}
