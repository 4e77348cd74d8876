use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Session and token lifecycle service")]
pub struct Cli {
    /// Settings file, without extension (defaults to settings/dev or settings/release)
    #[arg(long)]
    pub settings: Option<String>,
}
