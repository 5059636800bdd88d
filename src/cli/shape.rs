//! Shape command implementation

use clap::{Args, ValueEnum};

use crate::bracket::{self, BracketIdiom, BracketIntent};

#[derive(Args, Debug)]
pub struct ShapeArgs {
    /// Bracket idiom of the target venue
    #[arg(long, value_enum, default_value_t = IdiomArg::OnFill)]
    pub idiom: IdiomArg,

    /// Path to a bracket-intent JSON file, or '-' for stdin
    #[arg(default_value = "-")]
    pub input: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum IdiomArg {
    /// Single order with protective sub-orders attached on fill
    OnFill,
    /// Entry, take-profit, and stop-loss as three linked orders
    Linked,
}

impl ShapeArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let intent: BracketIntent =
            serde_json::from_str(&super::compute::read_input(&self.input)?)?;
        let idiom = match self.idiom {
            IdiomArg::OnFill => BracketIdiom::OnFill,
            IdiomArg::Linked => BracketIdiom::LinkedTriple,
        };
        let payload = bracket::shape(&intent, idiom);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        Ok(())
    }
}
