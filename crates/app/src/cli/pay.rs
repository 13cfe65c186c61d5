use clap::{Args, Subcommand};
use storefront_app::{
    api::models::{LeadUuid, OrderUuid, PaymentRequest},
    context::StorefrontContext,
    domain::payments::{PaymentPoller, PollOutcome, StatusCheck},
};

#[derive(Debug, Args)]
pub(crate) struct PayCommand {
    #[command(subcommand)]
    command: PaySubcommand,
}

#[derive(Debug, Subcommand)]
enum PaySubcommand {
    Initiate(InitiateArgs),
    Status(OrderArgs),
    Wait(OrderArgs),
}

#[derive(Debug, Args)]
struct InitiateArgs {
    /// Order the payment settles
    #[arg(long)]
    order: OrderUuid,

    /// Lead created at checkout
    #[arg(long)]
    lead: LeadUuid,

    /// Where the payment page sends the shopper back to
    #[arg(long)]
    return_url: String,
}

#[derive(Debug, Args)]
struct OrderArgs {
    #[arg(long)]
    order: OrderUuid,
}

pub(crate) async fn run(context: &StorefrontContext, command: PayCommand) -> Result<(), String> {
    match command.command {
        PaySubcommand::Initiate(args) => initiate(&context.payment_poller(args.order), args).await,
        PaySubcommand::Status(args) => status(&context.payment_poller(args.order)).await,
        PaySubcommand::Wait(args) => wait(&context.payment_poller(args.order)).await,
    }
}

async fn initiate(poller: &PaymentPoller, args: InitiateArgs) -> Result<(), String> {
    let redirect = poller
        .initiate_payment(PaymentRequest {
            lead: args.lead,
            return_url: args.return_url,
        })
        .await;

    let Some(url) = redirect else {
        return Err(failure_message(poller, "payment could not be started").await);
    };

    println!("redirect_url: {url}");

    Ok(())
}

async fn status(poller: &PaymentPoller) -> Result<(), String> {
    let check = poller.check_payment_status().await;

    let Some(status) = poller.last_status().await else {
        return Err(failure_message(poller, "payment status is unavailable").await);
    };

    let check = match check {
        StatusCheck::Succeeded => "succeeded",
        StatusCheck::Failed => "failed",
        StatusCheck::Pending => "pending",
    };

    println!("order: {}", status.id);
    println!("status: {:?}", status.status);
    if let Some(reference) = status.payment_reference {
        println!("payment_reference: {reference}");
    }
    println!("check: {check}");

    Ok(())
}

async fn wait(poller: &PaymentPoller) -> Result<(), String> {
    let outcome = tokio::select! {
        outcome = poller.start_polling() => outcome.map_err(|error| error.to_string())?,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|error| format!("failed to listen for ctrl-c: {error}"))?;

            poller.stop_polling().await;

            PollOutcome::Stopped
        }
    };

    match outcome {
        PollOutcome::Paid(status) => {
            println!("paid: {}", status.id);
            if let Some(reference) = status.payment_reference {
                println!("payment_reference: {reference}");
            }

            Ok(())
        }
        PollOutcome::Failed(failure) => Err(failure.to_string()),
        PollOutcome::Stopped => Err("payment polling stopped".to_string()),
    }
}

async fn failure_message(poller: &PaymentPoller, fallback: &str) -> String {
    poller
        .last_error()
        .await
        .unwrap_or_else(|| fallback.to_string())
}
