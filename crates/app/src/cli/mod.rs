use clap::{Parser, Subcommand};
use storefront_app::{config::StorefrontConfig, context::StorefrontContext};

mod cart;
mod checkout;
mod pay;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Storefront CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: StorefrontConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Cart(cart::CartCommand),
    Checkout(checkout::CheckoutArgs),
    Pay(pay::PayCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        let context = StorefrontContext::from_config(&self.config)
            .map_err(|error| format!("failed to initialize storefront: {error}"))?;

        match self.command {
            Commands::Cart(command) => cart::run(&context, command).await,
            Commands::Checkout(args) => checkout::run(&context, args).await,
            Commands::Pay(command) => pay::run(&context, command).await,
        }
    }
}

/// Format an amount in minor units as `units.cents`.
fn format_amount(minor: u64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}
