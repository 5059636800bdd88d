//! Compute command implementation

use clap::Args;
use std::io::Read;

use crate::config::Config;
use crate::guard::{OrderContext, OrderGuard};

#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Path to an order-context JSON file, or '-' for stdin
    #[arg(default_value = "-")]
    pub input: String,
}

impl ComputeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let ctx: OrderContext = serde_json::from_str(&read_input(&self.input)?)?;
        let guard = OrderGuard::new(&config.policy)?;
        let prices = guard.protective_prices(&ctx)?;

        tracing::info!(
            side = %ctx.side,
            entry = %ctx.entry,
            take_profit = %prices.take_profit,
            stop_loss = %prices.stop_loss,
            "protective prices computed"
        );
        println!("{}", serde_json::to_string_pretty(&prices)?);
        Ok(())
    }
}

pub(crate) fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
