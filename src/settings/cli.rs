use super::Parser;

/// Command line for the media server.
#[derive(Parser, Debug)]
#[command(name = "homevideo", about = "Personal media server")]
pub struct Cli {
    /// Path to the settings file, without the `.toml` extension being required.
    #[arg(long)]
    pub settings: Option<String>,
    /// Overrides `http.address` from the settings file.
    #[arg(long)]
    pub address: Option<String>,
}
